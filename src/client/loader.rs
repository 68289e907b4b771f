//! Load a client request (client + goals) from JSON

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Client, Goal};
use crate::error::LoadError;

/// One advisory request: a client and the goals to resolve for them
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalRequest {
    pub client: Client,
    pub goals: Vec<Goal>,
}

/// Load a request from any reader
pub fn load_request_from_reader<R: Read>(reader: R) -> Result<GoalRequest, LoadError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Load a request from a JSON file
pub fn load_request<P: AsRef<Path>>(path: P) -> Result<GoalRequest, LoadError> {
    let file = File::open(path)?;
    load_request_from_reader(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_sample_request() {
        let request = load_request("data/requests/sample.json");
        assert!(request.is_ok(), "Failed to load request: {:?}", request.err());

        let request = request.unwrap();
        assert!(!request.goals.is_empty());
        assert!(request.client.average_monthly_income > 0.0);
    }

    #[test]
    fn test_rejects_malformed() {
        let err = load_request_from_reader(r#"{"client": {}}"#.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadError::Json(_)));
    }
}
