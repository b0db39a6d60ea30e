use crate::config::BackendSettings;
use crate::core::dynamodb::DynamoDbClient;
use crate::core::ssm::SsmClient;
use crate::domain::ports::StoreClient;
use crate::utils::error::Result;

/// Builds the configured backend. The returned handle is created once and
/// reused for every lookup.
pub async fn connect(settings: &BackendSettings) -> Result<Box<dyn StoreClient>> {
    match settings {
        BackendSettings::DynamoDb(dynamodb) => {
            tracing::info!("Connecting to DynamoDB table '{}'", dynamodb.table);
            let client = DynamoDbClient::connect(dynamodb).await?;
            Ok(Box::new(client))
        }
        BackendSettings::Ssm(ssm) => {
            tracing::info!("Connecting to SSM Parameter Store");
            let client = SsmClient::connect(ssm).await?;
            Ok(Box::new(client))
        }
    }
}
