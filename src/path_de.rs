use serde::de::DeserializeOwned;

use crate::error::Error;
use crate::types::Type;
use crate::value::Value;

/// Deserialize with JSON-path context in error messages.
pub fn from_json_with_path<T: DeserializeOwned>(json: serde_json::Value) -> Result<T, Error> {
    serde_path_to_error::deserialize::<_, T>(json).map_err(|err| Error::Deserialize {
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    })
}

impl Type {
    /// Construct, then deserialize the result into `T`.
    pub fn construct_as<T: DeserializeOwned>(&self, input: &Value) -> Result<T, Error> {
        let value = self.construct(input)?;
        from_json_with_path(value.to_json()?)
    }
}
