use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::debug;

use glassdesk_core::domain::record::{ServiceRecord, Vehicle};
use glassdesk_core::identifier::EntityType;

use crate::services::{CollaboratorError, StatusLookup};

/// Demo customers served when no backend is configured.
#[derive(Clone, Debug)]
pub struct FixtureStatusLookup {
    records: HashMap<(EntityType, String), ServiceRecord>,
}

impl Default for FixtureStatusLookup {
    fn default() -> Self {
        let joao = fixture_record(
            "João da Silva",
            "12345678900",
            "11987654321",
            "ORD123456",
            "Em andamento",
            "Troca de Parabrisa",
            ("Honda Civic", "ABC1234", "2020"),
        );
        let maria = fixture_record(
            "Maria Oliveira",
            "98765432100",
            "11987654321",
            "ORD654321",
            "Concluído",
            "Reparo de Vidro",
            ("Toyota Corolla", "DEF5678", "2022"),
        );
        let carlos = fixture_record(
            "Carlos Pereira",
            "11122233344",
            "21987654321",
            "ORD789012",
            "Agendado",
            "Calibração ADAS",
            ("Volkswagen Golf", "GHI9012", "2023"),
        );

        let entries = [
            (EntityType::TaxId, "12345678900", &joao),
            (EntityType::TaxId, "98765432100", &maria),
            (EntityType::Phone, "11987654321", &maria),
            (EntityType::Phone, "21987654321", &carlos),
            (EntityType::OrderNumber, "ORD123456", &joao),
            (EntityType::OrderNumber, "ORD654321", &maria),
            (EntityType::OrderNumber, "ORD789012", &carlos),
            (EntityType::Plate, "ABC1234", &joao),
            (EntityType::Plate, "DEF5678", &maria),
            (EntityType::Plate, "GHI9012", &carlos),
            (EntityType::Chassis, "9BRBLWHEXG0123456", &carlos),
        ];

        Self {
            records: entries
                .into_iter()
                .map(|(id_type, identifier, record)| {
                    ((id_type, identifier.to_string()), record.clone())
                })
                .collect(),
        }
    }
}

impl FixtureStatusLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_record(
        mut self,
        id_type: EntityType,
        identifier: impl Into<String>,
        record: ServiceRecord,
    ) -> Self {
        self.records.insert((id_type, identifier.into()), record);
        self
    }
}

#[async_trait]
impl StatusLookup for FixtureStatusLookup {
    async fn lookup(
        &self,
        id_type: EntityType,
        identifier: &str,
    ) -> Result<Option<ServiceRecord>, CollaboratorError> {
        Ok(self.records.get(&(id_type, identifier.to_string())).cloned())
    }
}

fn fixture_record(
    name: &str,
    tax_id: &str,
    phone: &str,
    order_id: &str,
    status: &str,
    service_type: &str,
    (model, plate, year): (&str, &str, &str),
) -> ServiceRecord {
    ServiceRecord {
        name: name.to_string(),
        tax_id: Some(tax_id.to_string()),
        phone: Some(phone.to_string()),
        order_id: order_id.to_string(),
        status: status.to_string(),
        service_type: service_type.to_string(),
        vehicle: Vehicle {
            model: model.to_string(),
            plate: plate.to_string(),
            year: year.to_string(),
        },
        summary: None,
    }
}

/// Status backend reached over HTTP at `{base_url}/status/{kind}/{identifier}`.
#[derive(Clone, Debug)]
pub struct HttpStatusLookup {
    client: Client,
    base_url: String,
}

impl HttpStatusLookup {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CollaboratorError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, id_type: EntityType, identifier: &str) -> String {
        format!("{}/status/{}/{}", self.base_url, backend_kind(id_type), identifier)
    }
}

#[async_trait]
impl StatusLookup for HttpStatusLookup {
    async fn lookup(
        &self,
        id_type: EntityType,
        identifier: &str,
    ) -> Result<Option<ServiceRecord>, CollaboratorError> {
        let url = self.url(id_type, identifier);
        let response =
            self.client.get(&url).header("accept", "application/json").send().await?;

        match response.status() {
            StatusCode::OK => {
                let record: BackendRecord = response.json().await?;
                Ok(Some(record.into_record()))
            }
            StatusCode::NOT_FOUND => {
                debug!(
                    event_name = "lookup.not_found",
                    id_type = id_type.as_str(),
                    "status backend has no record"
                );
                Ok(None)
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(CollaboratorError::UnexpectedResponse(format!("status {status}: {body}")))
            }
        }
    }
}

/// Path segment the backend uses for each identifier kind.
fn backend_kind(id_type: EntityType) -> &'static str {
    match id_type {
        EntityType::TaxId => "cpf",
        EntityType::Phone => "telefone",
        EntityType::Plate => "placa",
        EntityType::Chassis => "chassi",
        EntityType::OrderNumber => "ordem",
    }
}

#[derive(Debug, Deserialize)]
struct BackendRecord {
    #[serde(default, rename = "nome")]
    name: String,
    #[serde(default, rename = "cpf")]
    tax_id: Option<String>,
    #[serde(default, rename = "telefone")]
    phone: Option<String>,
    #[serde(default, rename = "ordem")]
    order_id: String,
    #[serde(default)]
    status: Option<String>,
    #[serde(default, rename = "tipo_servico")]
    service_type: String,
    #[serde(default, rename = "veiculo")]
    vehicle: BackendVehicle,
    #[serde(default, rename = "mensagem_ia")]
    summary: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BackendVehicle {
    #[serde(default, rename = "modelo")]
    model: String,
    #[serde(default, rename = "placa")]
    plate: String,
    #[serde(default, rename = "ano")]
    year: String,
}

impl BackendRecord {
    fn into_record(self) -> ServiceRecord {
        ServiceRecord {
            name: self.name,
            tax_id: non_empty(self.tax_id),
            phone: non_empty(self.phone),
            order_id: self.order_id,
            status: non_empty(self.status).unwrap_or_else(|| "Em processamento".to_string()),
            service_type: self.service_type,
            vehicle: Vehicle {
                model: self.vehicle.model,
                plate: self.vehicle.plate,
                year: self.vehicle.year,
            },
            summary: non_empty(self.summary),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|text| !text.trim().is_empty())
}
