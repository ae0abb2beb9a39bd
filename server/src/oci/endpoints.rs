//! Service endpoints

use serde::{Deserialize, Serialize};

/// Remote OCI services the server talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    OperationsInsights,
    DatabaseManagement,
    Identity,
    Database,
}

impl Service {
    pub fn as_str(&self) -> &'static str {
        match self {
            Service::OperationsInsights => "operations_insights",
            Service::DatabaseManagement => "database_management",
            Service::Identity => "identity",
            Service::Database => "database",
        }
    }

    pub fn api_version(&self) -> &'static str {
        match self {
            Service::OperationsInsights => "20200630",
            Service::DatabaseManagement => "20201101",
            Service::Identity => "20160918",
            Service::Database => "20160918",
        }
    }

    /// Base URL including the API version, without a trailing slash
    pub fn base_url(&self, region: &str) -> String {
        let host = match self {
            Service::OperationsInsights => {
                format!("operationsinsights.{}.oci.oraclecloud.com", region)
            }
            Service::DatabaseManagement => format!("dbmgmt.{}.oci.oraclecloud.com", region),
            Service::Identity => format!("identity.{}.oci.oraclecloud.com", region),
            Service::Database => format!("database.{}.oraclecloud.com", region),
        };
        format!("https://{}/{}", host, self.api_version())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_urls() {
        assert_eq!(
            Service::OperationsInsights.base_url("us-ashburn-1"),
            "https://operationsinsights.us-ashburn-1.oci.oraclecloud.com/20200630"
        );
        assert_eq!(
            Service::DatabaseManagement.base_url("eu-frankfurt-1"),
            "https://dbmgmt.eu-frankfurt-1.oci.oraclecloud.com/20201101"
        );
        assert_eq!(
            Service::Database.base_url("ap-tokyo-1"),
            "https://database.ap-tokyo-1.oraclecloud.com/20160918"
        );
    }
}
