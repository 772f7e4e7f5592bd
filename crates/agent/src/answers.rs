use async_trait::async_trait;
use tracing::warn;

use glassdesk_core::domain::record::{ServiceRecord, StatusTone};
use glassdesk_core::domain::session::Channel;

use crate::llm::LlmClient;
use crate::services::AnswerGenerator;

pub const SUPPORT_PHONE: &str = "0800-727-2327";

pub const FALLBACK_ANSWER: &str = "Desculpe, não consegui processar sua pergunta neste momento. \
Por favor, tente novamente ou entre em contato com nossa central de atendimento pelo telefone \
0800-727-2327 para obter assistência.";

const DEADLINE_WORDS: &[&str] = &["prazo", "previsão", "previsao", "quando", "tempo", "demora"];
const PARTS_WORDS: &[&str] = &["peça", "peca", "material", "vidro"];
const STORE_WORDS: &[&str] = &["loja", "unidade", "próxima", "proxima", "endereço", "endereco"];
const WARRANTY_WORDS: &[&str] = &["garantia", "seguro"];
const PRICE_WORDS: &[&str] = &["preço", "preco", "valor", "custo", "pagamento"];
const STATUS_WORDS: &[&str] = &["status", "andamento", "situação", "situacao"];

/// Canned answers keyed on topic words, filled in from the customer's record.
#[derive(Clone, Debug, Default)]
pub struct RuleBasedAnswerGenerator;

impl RuleBasedAnswerGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn answer(&self, question: &str, record: &ServiceRecord) -> String {
        let lowered = question.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|word| lowered.contains(word));
        let service = &record.service_type;

        if mentions(DEADLINE_WORDS) {
            match record.status_tone() {
                StatusTone::InProgress => format!(
                    "Seu serviço de {service} está em andamento e a previsão de conclusão é para \
                     hoje até o final do dia. Assim que for finalizado, você receberá uma \
                     notificação."
                ),
                StatusTone::Scheduled => format!(
                    "Seu serviço está agendado e será realizado conforme data e horário \
                     combinados. Para confirmar o horário exato, recomendo entrar em contato com \
                     nossa central pelo {SUPPORT_PHONE}."
                ),
                StatusTone::Complete => {
                    "Seu serviço já foi concluído! O veículo foi entregue conforme solicitado."
                        .to_string()
                }
                StatusTone::Other => format!(
                    "Seu serviço de {service} está com status: {}. Assim que houver uma \
                     previsão de conclusão, você receberá uma notificação.",
                    record.status
                ),
            }
        } else if mentions(PARTS_WORDS) {
            format!(
                "Para o serviço de {service}, estamos utilizando peças originais com garantia de \
                 fábrica. Todos os materiais já estão em estoque e são de primeira linha para \
                 garantir a qualidade do serviço."
            )
        } else if mentions(STORE_WORDS) {
            "Temos várias unidades disponíveis. As mais próximas e com disponibilidade para \
             atendimento são:\n\n- CarGlass Morumbi: Av. Dr. Guilherme Dumont Vilares, 1163\n- \
             CarGlass Santana: R. Voluntários da Pátria, 2191\n\nDeseja que eu informe mais \
             detalhes sobre alguma delas?"
                .to_string()
        } else if mentions(WARRANTY_WORDS) {
            format!(
                "Todos os serviços da CarGlass possuem garantia. Para o serviço de {service}, a \
                 garantia é de 12 meses para defeitos de instalação. Em caso de trincas ou \
                 quebras por impacto, não é coberto pela garantia."
            )
        } else if mentions(PRICE_WORDS) {
            format!(
                "O valor do serviço de {service} já foi definido e está registrado em nossa ordem \
                 de serviço. Para informações detalhadas sobre valores e formas de pagamento, por \
                 favor entre em contato com nossa central pelo {SUPPORT_PHONE}."
            )
        } else if mentions(STATUS_WORDS) {
            format!(
                "O status atual do seu atendimento é: {}. A ordem de serviço {} está sendo \
                 acompanhada por nossa equipe para garantir a qualidade do serviço.",
                record.status, record.order_id
            )
        } else {
            format!(
                "Olá {}, obrigado por sua pergunta.\n\nBaseado nas informações que temos, seu \
                 serviço de {service} está com status: {}.\n\nPara obter informações mais \
                 detalhadas sobre sua pergunta específica, recomendo entrar em contato com nossa \
                 central de atendimento pelo {SUPPORT_PHONE}.",
                record.name, record.status
            )
        }
    }
}

#[async_trait]
impl AnswerGenerator for RuleBasedAnswerGenerator {
    async fn generate(&self, question: &str, record: &ServiceRecord, _channel: Channel) -> String {
        self.answer(question, record)
    }
}

/// Model-backed answers with the record as context.
pub struct LlmAnswerGenerator<C> {
    client: C,
}

impl<C> LlmAnswerGenerator<C>
where
    C: LlmClient,
{
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C> AnswerGenerator for LlmAnswerGenerator<C>
where
    C: LlmClient,
{
    async fn generate(&self, question: &str, record: &ServiceRecord, channel: Channel) -> String {
        let prompt = system_prompt(question, record, channel);
        match self.client.complete(&prompt, question).await {
            Ok(answer) if !answer.trim().is_empty() => answer,
            Ok(_) => {
                warn!(event_name = "answers.llm.empty", "llm returned an empty answer");
                FALLBACK_ANSWER.to_string()
            }
            Err(error) => {
                warn!(event_name = "answers.llm.failed", error = %error, "llm answer failed");
                FALLBACK_ANSWER.to_string()
            }
        }
    }
}

fn system_prompt(question: &str, record: &ServiceRecord, channel: Channel) -> String {
    let style = match channel {
        Channel::Web => "Use parágrafos curtos.",
        Channel::Whatsapp => "Use mensagens curtas, próprias para WhatsApp, sem HTML.",
    };
    format!(
        "Você é o assistente virtual da CarGlass, uma empresa especializada em reparo e troca de \
         vidros automotivos.\nVocê está conversando com {name}, que tem um atendimento com as \
         seguintes informações:\n\n- Status do atendimento: {status}\n- Ordem de serviço: \
         {order}\n- Tipo de serviço: {service}\n- Veículo: {model} - {year}\n- Placa: \
         {plate}\n\nResponda de forma educada, clara e concisa. {style} Se não tiver certeza \
         sobre alguma informação específica, sugira que o cliente entre em contato com a central \
         de atendimento pelo {SUPPORT_PHONE}.\n\nO cliente está perguntando: {question}\nForneça \
         uma resposta personalizada considerando o contexto do atendimento.",
        name = record.name,
        status = record.status,
        order = record.order_id,
        service = record.service_type,
        model = record.vehicle.model,
        year = record.vehicle.year,
        plate = record.vehicle.plate,
    )
}
