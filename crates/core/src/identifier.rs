//! Customer identifier recognition.
//!
//! Rules are evaluated in a fixed order and the first match wins, so an
//! eleven digit string is always a tax id even though it would also satisfy
//! the phone length range.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    TaxId,
    Phone,
    Plate,
    Chassis,
    OrderNumber,
}

impl EntityType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TaxId => "tax_id",
            Self::Phone => "phone",
            Self::Plate => "plate",
            Self::Chassis => "chassis",
            Self::OrderNumber => "order_number",
        }
    }

    /// Name shown to customers.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::TaxId => "CPF",
            Self::Phone => "telefone",
            Self::Plate => "placa",
            Self::Chassis => "chassi",
            Self::OrderNumber => "número da ordem de serviço",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub entity_type: Option<EntityType>,
    pub value: String,
}

impl Classification {
    fn matched(entity_type: EntityType, value: String) -> Self {
        Self { entity_type: Some(entity_type), value }
    }

    fn unrecognized(value: String) -> Self {
        Self { entity_type: None, value }
    }
}

pub fn classify(text: &str) -> Classification {
    let cleaned: String = text.chars().filter(char::is_ascii_alphanumeric).collect();
    let upper = cleaned.to_ascii_uppercase();
    let digits_only = !cleaned.is_empty() && cleaned.bytes().all(|b| b.is_ascii_digit());

    if digits_only && cleaned.len() == 11 {
        return Classification::matched(EntityType::TaxId, cleaned);
    }
    if digits_only && (10..=11).contains(&cleaned.len()) {
        return Classification::matched(EntityType::Phone, cleaned);
    }
    if is_plate(cleaned.as_bytes()) {
        return Classification::matched(EntityType::Plate, upper);
    }
    if is_chassis(upper.as_bytes()) {
        return Classification::matched(EntityType::Chassis, upper);
    }
    if digits_only && (5..=8).contains(&cleaned.len()) {
        return Classification::matched(EntityType::OrderNumber, format!("ORD{cleaned}"));
    }
    if upper.starts_with("ORD") {
        return Classification::matched(EntityType::OrderNumber, upper);
    }

    Classification::unrecognized(cleaned)
}

// Legacy `AAA9999` and Mercosul `AAA9A99` layouts.
fn is_plate(bytes: &[u8]) -> bool {
    if bytes.len() != 7 || !bytes[..3].iter().all(u8::is_ascii_alphabetic) {
        return false;
    }
    let tail = &bytes[3..];
    let legacy = tail.iter().all(u8::is_ascii_digit);
    let mercosul = tail[0].is_ascii_digit()
        && tail[1].is_ascii_alphabetic()
        && tail[2..].iter().all(u8::is_ascii_digit);
    legacy || mercosul
}

fn is_chassis(upper: &[u8]) -> bool {
    upper.len() == 17
        && upper.iter().all(|&b| {
            (b.is_ascii_uppercase() && !matches!(b, b'I' | b'O' | b'Q')) || b.is_ascii_digit()
        })
}

#[cfg(test)]
mod tests {
    use super::{classify, EntityType};

    struct Case {
        input: &'static str,
        expected_type: Option<EntityType>,
        expected_value: &'static str,
    }

    #[test]
    fn classifies_identifier_formats_in_rule_order() {
        let cases = [
            Case {
                input: "12345678900",
                expected_type: Some(EntityType::TaxId),
                expected_value: "12345678900",
            },
            Case {
                input: "123.456.789-00",
                expected_type: Some(EntityType::TaxId),
                expected_value: "12345678900",
            },
            Case {
                input: "(21) 8765-4321",
                expected_type: Some(EntityType::Phone),
                expected_value: "2187654321",
            },
            Case {
                input: "abc-1234",
                expected_type: Some(EntityType::Plate),
                expected_value: "ABC1234",
            },
            Case {
                input: "bra2e19",
                expected_type: Some(EntityType::Plate),
                expected_value: "BRA2E19",
            },
            Case {
                input: "9brblwhexg0123456",
                expected_type: Some(EntityType::Chassis),
                expected_value: "9BRBLWHEXG0123456",
            },
            Case {
                input: "ord123456",
                expected_type: Some(EntityType::OrderNumber),
                expected_value: "ORD123456",
            },
            Case {
                input: "123456",
                expected_type: Some(EntityType::OrderNumber),
                expected_value: "ORD123456",
            },
            Case { input: "oi", expected_type: None, expected_value: "oi" },
            Case { input: "1234", expected_type: None, expected_value: "1234" },
            Case { input: "", expected_type: None, expected_value: "" },
        ];

        for case in cases {
            let result = classify(case.input);
            assert_eq!(result.entity_type, case.expected_type, "input: {}", case.input);
            assert_eq!(result.value, case.expected_value, "input: {}", case.input);
        }
    }

    #[test]
    fn every_eleven_digit_string_is_a_tax_id() {
        let mut seed: u64 = 0x9E37_79B9_7F4A_7C15;
        for _ in 0..500 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let digits = format!("{:011}", seed % 100_000_000_000);

            let result = classify(&digits);
            assert_eq!(result.entity_type, Some(EntityType::TaxId));
            assert_eq!(result.value, digits);
        }
    }

    #[test]
    fn every_seventeen_character_vin_is_a_chassis() {
        const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPRSTUVWXYZ0123456789";
        const SEPARATORS: [char; 3] = ['-', ' ', '.'];

        let mut seed: u64 = 0x243F_6A88_85A3_08D3;
        let mut next = |bound: usize| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((seed >> 33) as usize) % bound
        };

        for _ in 0..500 {
            let mut input = String::new();
            let mut expected = String::new();
            for position in 0..17 {
                let ch = char::from(ALPHABET[next(ALPHABET.len())]);
                expected.push(ch);
                input.push(if next(2) == 0 { ch.to_ascii_lowercase() } else { ch });
                if position < 16 && next(4) == 0 {
                    input.push(SEPARATORS[next(SEPARATORS.len())]);
                }
            }

            let result = classify(&input);
            assert_eq!(result.entity_type, Some(EntityType::Chassis), "input: {input}");
            assert_eq!(result.value, expected, "input: {input}");
        }
    }

    #[test]
    fn plates_normalise_to_upper_case_in_both_layouts() {
        for input in ["xyz9876", "XyZ9876", "kkk1a23", "KKK1A23"] {
            let result = classify(input);
            assert_eq!(result.entity_type, Some(EntityType::Plate), "input: {input}");
            assert_eq!(result.value, input.to_ascii_uppercase());
        }
    }

    #[test]
    fn seventeen_characters_with_forbidden_letters_are_rejected() {
        for forbidden in ['I', 'O', 'Q'] {
            let mut candidate = String::from("9BRBLWHEXG012345");
            candidate.insert(3, forbidden);
            assert_eq!(candidate.len(), 17);

            let result = classify(&candidate);
            assert_eq!(result.entity_type, None, "input: {candidate}");
        }
    }

    #[test]
    fn eleven_digit_mobile_numbers_resolve_as_tax_id() {
        let result = classify("11987654321");
        assert_eq!(result.entity_type, Some(EntityType::TaxId));
    }
}
