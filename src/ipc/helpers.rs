use serde::de::DeserializeOwned;

/// Requests may omit `params` entirely; treat that as the payload's default
/// shape instead of a type error.
pub fn parse_params<T>(params: &serde_json::Value) -> Result<T, serde_json::Error>
where
    T: DeserializeOwned + Default,
{
    if params.is_null() {
        Ok(T::default())
    } else {
        serde_json::from_value(params.clone())
    }
}
