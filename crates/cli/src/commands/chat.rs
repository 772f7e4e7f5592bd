//! Terminal stand-in for the web chat: fixture collaborators, in-memory
//! sessions, one user.

use std::io::{self, BufRead, Write};
use std::time::Duration;

use glassdesk_agent::{ActionOrchestrator, CollaboratorTimeouts, Collaborators};
use glassdesk_core::config::DEFAULT_SESSION_TTL_SECS;
use glassdesk_core::domain::session::{Channel, GREETING};
use glassdesk_core::errors::ApplicationError;
use glassdesk_db::SessionStore;
use serde_json::json;

use crate::commands::{runtime, CommandResult};

pub const TERMINAL_USER_ID: &str = "terminal";

const RESET_COMMAND: &str = "/reset";
const QUIT_COMMAND: &str = "/quit";

pub fn run() -> CommandResult {
    let stdin = io::stdin();
    let stdout = io::stdout();
    run_with_io(stdin.lock(), stdout.lock(), TERMINAL_USER_ID)
}

pub fn run_with_io<R, W>(input: R, mut output: W, user_id: &str) -> CommandResult
where
    R: BufRead,
    W: Write,
{
    let runtime = match runtime() {
        Ok(runtime) => runtime,
        Err(error) => return CommandResult::failure("chat", "runtime_init", error, 3),
    };
    let collaborators = match Collaborators::fixtures() {
        Ok(collaborators) => collaborators,
        Err(error) => {
            return CommandResult::failure("chat", "reply_templates", error.to_string(), 3);
        }
    };
    let orchestrator = ActionOrchestrator::new(
        SessionStore::in_memory(Duration::from_secs(DEFAULT_SESSION_TTL_SECS)),
        collaborators,
        CollaboratorTimeouts::default(),
    );

    let mut turns = 0usize;
    if let Err(error) = say(&mut output, GREETING) {
        return CommandResult::failure("chat", "io", error.to_string(), 6);
    }

    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(error) => return CommandResult::failure("chat", "io", error.to_string(), 6),
        };

        let reply = match line.trim() {
            "" => continue,
            QUIT_COMMAND => break,
            RESET_COMMAND => runtime.block_on(orchestrator.reset_session(Channel::Web, user_id)),
            text => runtime
                .block_on(orchestrator.converse(text, Channel::Web, user_id))
                .map(|turn| turn.reply),
        };
        turns += 1;

        let reply = reply.unwrap_or_else(|error: ApplicationError| {
            error.into_interface("terminal").user_message().to_string()
        });
        if let Err(error) = say(&mut output, &reply) {
            return CommandResult::failure("chat", "io", error.to_string(), 6);
        }
    }

    CommandResult::success_with_data("chat", "chat session ended", json!({ "turns": turns }))
}

fn say(output: &mut impl Write, reply: &str) -> io::Result<()> {
    writeln!(output, "assistente: {}", plain_text(reply))?;
    writeln!(output)?;
    output.flush()
}

/// Web replies carry status tags and escaped entities; the terminal wants
/// bare text.
fn plain_text(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for ch in html.chars() {
        match ch {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(ch),
            _ => {}
        }
    }

    const ENTITIES: [(&str, &str); 6] = [
        ("&lt;", "<"),
        ("&gt;", ">"),
        ("&quot;", "\""),
        ("&#x27;", "'"),
        ("&#x2F;", "/"),
        ("&amp;", "&"),
    ];
    ENTITIES.into_iter().fold(text, |text, (entity, plain)| text.replace(entity, plain))
}

#[cfg(test)]
mod tests {
    use super::plain_text;

    #[test]
    fn strips_status_tags_and_entities() {
        let html =
            "Status: <span class=\"status-tag progress\">Em andamento</span> &amp; D&#x27;Ávila";

        assert_eq!(plain_text(html), "Status: Em andamento & D'Ávila");
    }
}
