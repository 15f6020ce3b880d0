//! Deterministic names for everything provisioned alongside a knowledge base

use sha2::{Digest, Sha256};

/// OpenSearch Serverless collection and policy names are capped at 32 characters
const AOSS_NAME_LIMIT: usize = 32;
const AOSS_PREFIX_LIMIT: usize = 16;
const BUCKET_NAME_LIMIT: usize = 63;
const DIGEST_LEN: usize = 8;

/// Names of the remote resources backing one knowledge base.
///
/// Derived only from the knowledge base name, region and account so that
/// create, retrieve and delete agree without any local state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionedResources {
    pub bucket_name: String,
    pub execution_role_name: String,
    pub foundation_model_policy_name: String,
    pub s3_policy_name: String,
    pub aoss_policy_name: String,
    pub encryption_policy_name: String,
    pub network_policy_name: String,
    pub access_policy_name: String,
    pub collection_name: String,
    pub index_name: String,
}

impl ProvisionedResources {
    pub fn new(kb_name: &str, region: &str, account_id: &str) -> Self {
        let digest = name_digest(&[kb_name, region, account_id]);
        let prefix = aoss_prefix(kb_name);

        let aoss = |kind: &str| {
            let name = format!("{}-{}-{}", prefix, kind, digest);
            debug_assert!(name.len() <= AOSS_NAME_LIMIT);
            name
        };

        Self {
            bucket_name: bucket_name(kb_name, region, account_id),
            execution_role_name: format!("AmazonBedrockExecutionRoleForKnowledgeBase_{}", digest),
            foundation_model_policy_name: format!(
                "AmazonBedrockFoundationModelPolicyForKnowledgeBase_{}",
                digest
            ),
            s3_policy_name: format!("AmazonBedrockS3PolicyForKnowledgeBase_{}", digest),
            aoss_policy_name: format!("AmazonBedrockOSSPolicyForKnowledgeBase_{}", digest),
            encryption_policy_name: aoss("sp"),
            network_policy_name: aoss("np"),
            access_policy_name: aoss("ap"),
            collection_name: aoss("vs"),
            index_name: format!("{}-index-{}", prefix, digest),
        }
    }
}

/// Leading hex characters of a SHA-256 over the parts, NUL-separated so ("ab","c") != ("a","bc")
fn name_digest(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part.as_bytes());
        hasher.update([0u8]);
    }

    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(DIGEST_LEN);
    digest
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c.to_ascii_lowercase() {
            c @ ('a'..='z' | '0'..='9' | '-') => c,
            _ => '-',
        })
        .collect()
}

/// Lowercase prefix starting with a letter, short enough for AOSS names
fn aoss_prefix(kb_name: &str) -> String {
    let mut prefix = sanitize(kb_name);

    if !prefix.starts_with(|c: char| c.is_ascii_lowercase()) {
        prefix.insert_str(0, "kb");
    }

    prefix.truncate(AOSS_PREFIX_LIMIT);
    prefix.trim_end_matches('-').to_string()
}

fn bucket_name(kb_name: &str, region: &str, account_id: &str) -> String {
    let suffix = format!("-{}-{}", region, account_id);
    let mut base = sanitize(kb_name);
    base.truncate(BUCKET_NAME_LIMIT.saturating_sub(suffix.len()));

    let base = base.trim_matches('-');
    format!("{}{}", if base.is_empty() { "kb" } else { base }, suffix)
}
