//! The IAM capability port: role/policy discovery for the posture pass.

use async_trait::async_trait;

use crate::error::ConnectorError;

#[async_trait]
pub trait IamCapability: Send + Sync {
    async fn list_roles(&self) -> Result<Vec<String>, ConnectorError>;

    async fn list_attached_role_policies(&self, role_name: &str) -> Result<Vec<String>, ConnectorError>;
}

/// Extracts the bare role name from an IAM role ARN.
///
/// `arn:aws:iam::123456789012:role/path/to/MyRole` -> `MyRole`. IAM role
/// names never contain `/` — the path (`path/to/`) is a separate ARN
/// component, not part of the name the `ListAttachedRolePolicies` API
/// accepts. The known source bug this resolves (see Open Question (c))
/// passed the resource half of the ARN, path included, straight through as
/// the role name; that only happened to work for unpathed roles and failed
/// the API call for anything nested under a path.
pub fn role_name_from_arn(arn: &str) -> Result<String, ConnectorError> {
    let resource = arn
        .splitn(6, ':')
        .nth(5)
        .ok_or_else(|| ConnectorError::MalformedIdentifier(format!("not an ARN: {arn}")))?;

    if resource.strip_prefix("role/").is_none() {
        return Err(ConnectorError::MalformedIdentifier(format!("not a role ARN: {arn}")));
    }

    let name = resource
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConnectorError::MalformedIdentifier(format!("empty role name in ARN: {arn}")))?;

    Ok(name.to_string())
}

/// Accepts either a bare role name or a full role ARN and returns the bare
/// name `ListAttachedRolePolicies` requires, parsing it out when given an
/// ARN rather than passing the ARN straight through.
pub fn role_name_or_parse(role_name_or_arn: &str) -> Result<String, ConnectorError> {
    if role_name_or_arn.starts_with("arn:") {
        role_name_from_arn(role_name_or_arn)
    } else {
        Ok(role_name_or_arn.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_unpathed_role_name() {
        let arn = "arn:aws:iam::123456789012:role/MyRole";
        assert_eq!(role_name_from_arn(arn).unwrap(), "MyRole");
    }

    #[test]
    fn extracts_bare_name_from_pathed_role() {
        let arn = "arn:aws:iam::123456789012:role/service-role/lambda/MyRole";
        assert_eq!(role_name_from_arn(arn).unwrap(), "MyRole");
    }

    #[test]
    fn role_name_or_parse_passes_bare_names_through() {
        assert_eq!(role_name_or_parse("MyRole").unwrap(), "MyRole");
    }

    #[test]
    fn role_name_or_parse_parses_arns() {
        let arn = "arn:aws:iam::123456789012:role/MyRole";
        assert_eq!(role_name_or_parse(arn).unwrap(), "MyRole");
    }

    #[test]
    fn rejects_non_role_arn() {
        let arn = "arn:aws:iam::123456789012:user/MyUser";
        assert!(role_name_from_arn(arn).is_err());
    }

    #[test]
    fn rejects_malformed_arn() {
        assert!(role_name_from_arn("not-an-arn").is_err());
    }
}
