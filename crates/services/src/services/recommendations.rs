//! AI-written management recommendations based on the institution's numbers.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{error, info};
use ts_rs::TS;

use super::{
    ai_client::{AiClient, AiClientError, ChatMessage},
    data_service::{DataError, DataErrorKind, FunctionInvoker, functions},
    error_classifier::{ClientError, classify},
    stats::InstitutionStats,
};

const SYSTEM_PROMPT: &str = "Você é um assistente de análise financeira para instituições educacionais. \
Analise os dados fornecidos e forneça 3-5 recomendações práticas e acionáveis em português de Portugal.

Foque em:
- Otimização de custos
- Eficiência operacional
- Sustentabilidade financeira
- Gestão de recursos humanos
- Crescimento institucional

Seja específico, usando os números reais fornecidos. Cada recomendação deve ser concisa (1-2 frases) e prática.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
pub struct Recommendations {
    pub recommendations: String,
    pub context: InstitutionStats,
}

#[derive(Debug, Error)]
pub enum RecommendationError {
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Ai(#[from] AiClientError),
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, AiClientError>;
}

#[async_trait]
impl TextGenerator for AiClient {
    async fn generate(&self, messages: &[ChatMessage]) -> Result<String, AiClientError> {
        self.complete(messages).await
    }
}

pub fn user_prompt(stats: &InstitutionStats) -> String {
    let finances = stats.finances.clone().unwrap_or_default();
    format!(
        "Dados da instituição:

ALUNOS:
- Total: {}
- Ativos: {}
- Graduados: {}

FUNCIONÁRIOS:
- Total: {}
- Ativos: {}
- Custo total de salários: €{:.2}

FINANÇAS:
- Receitas totais: €{:.2}
- Despesas totais: €{:.2}
- Saldo: €{:.2}
- Total de transações: {}

Forneça recomendações práticas para melhorar a gestão desta instituição.",
        stats.students.total,
        stats.students.active,
        stats.students.graduated,
        stats.staff.total,
        stats.staff.active,
        stats.staff.total_salaries,
        finances.total_revenue,
        finances.total_expenses,
        finances.balance,
        finances.transactions,
    )
}

#[derive(Clone)]
pub struct RecommendationService {
    generator: Arc<dyn TextGenerator>,
}

impl RecommendationService {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    pub async fn generate(&self, pool: &SqlitePool) -> Result<Recommendations, RecommendationError> {
        let context = InstitutionStats::collect(pool, true).await?;
        let messages = [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user_prompt(&context))];
        let recommendations = self.generator.generate(&messages).await.map_err(|e| {
            error!(error = %e, "recommendation generation failed");
            e
        })?;
        info!(chars = recommendations.len(), "generated recommendations");
        Ok(Recommendations {
            recommendations,
            context,
        })
    }
}

/// Client side: ask the backend function for recommendations.
pub async fn request_recommendations(
    invoker: &dyn FunctionInvoker,
) -> Result<Recommendations, ClientError> {
    let value = invoker
        .invoke(functions::AI_RECOMMENDATIONS, serde_json::json!({}))
        .await
        .map_err(|e| classify(&e))?;
    serde_json::from_value(value).map_err(|e| {
        classify(&DataError::new(DataErrorKind::Decode, e.to_string()))
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use db::DBService;

    use super::*;

    struct Canned {
        seen: Mutex<Vec<ChatMessage>>,
    }

    #[async_trait]
    impl TextGenerator for Canned {
        async fn generate(&self, messages: &[ChatMessage]) -> Result<String, AiClientError> {
            self.seen.lock().unwrap().extend_from_slice(messages);
            Ok("1. Rever contratos de fornecimento.".into())
        }
    }

    #[tokio::test]
    async fn prompt_carries_real_numbers() {
        let db = DBService::new_in_memory().await.unwrap();
        let canned = Arc::new(Canned {
            seen: Mutex::new(Vec::new()),
        });
        let service = RecommendationService::new(canned.clone());
        let result = service.generate(&db.pool).await.unwrap();
        assert_eq!(result.recommendations, "1. Rever contratos de fornecimento.");
        assert!(result.context.finances.is_some());

        let seen = canned.seen.lock().unwrap();
        assert_eq!(seen[0].role, "system");
        assert!(seen[1].content.contains("- Saldo: €0.00"));
    }

    struct Offline;

    #[async_trait]
    impl FunctionInvoker for Offline {
        async fn invoke(&self, _: &str, _: serde_json::Value) -> Result<serde_json::Value, DataError> {
            Err(DataError::transport("connection refused"))
        }
    }

    #[tokio::test]
    async fn client_request_classifies_failures() {
        assert_eq!(
            request_recommendations(&Offline).await.unwrap_err(),
            ClientError::TransientNetwork
        );
    }
}
