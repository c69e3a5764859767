use std::collections::HashMap;

use crate::error::{JobDockError, Result};

/// Whether `key` can be passed to a job as an argument name.
pub fn is_valid_argument_name(key: &str) -> bool {
    !key.is_empty() && !key.contains('=')
}

/// Reject argument maps containing a name no executor can pass on.
pub fn validate_job_arguments(arguments: &HashMap<String, String>) -> Result<()> {
    match arguments.keys().find(|key| !is_valid_argument_name(key)) {
        Some(key) => Err(JobDockError::InvalidArgument(format!(
            "{:?} is not a valid argument name",
            key
        ))),
        None => Ok(()),
    }
}

/// Parse `key=value` tokens into an argument map.
///
/// Each token is split on its first `=`, so values may contain `=`. A later
/// token for the same key replaces the earlier value.
pub fn parse_job_arguments<I, S>(tokens: I) -> Result<HashMap<String, String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut arguments = HashMap::new();
    for token in tokens {
        let token = token.as_ref();
        let (key, value) = token.split_once('=').ok_or_else(|| {
            JobDockError::InvalidArgument(format!("{:?} is not of the form key=value", token))
        })?;
        if key.is_empty() {
            return Err(JobDockError::InvalidArgument(format!(
                "{:?} has an empty key",
                token
            )));
        }
        arguments.insert(key.to_string(), value.to_string());
    }
    Ok(arguments)
}
