//! IAM and OpenSearch Serverless policy documents

use serde_json::{json, Value};

/// Field names the knowledge base maps onto the vector index
pub const VECTOR_FIELD: &str = "vector";
pub const TEXT_FIELD: &str = "text";
pub const METADATA_FIELD: &str = "text-metadata";

/// Trust policy letting Bedrock assume the execution role
pub fn assume_role_policy() -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": "bedrock.amazonaws.com" },
            "Action": "sts:AssumeRole"
        }]
    })
}

pub fn foundation_model_policy(region: &str, embedding_model_id: &str) -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Action": ["bedrock:InvokeModel"],
            "Resource": [format!(
                "arn:aws:bedrock:{}::foundation-model/{}",
                region, embedding_model_id
            )]
        }]
    })
}

pub fn s3_policy(bucket_name: &str, account_id: &str) -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Action": ["s3:GetObject", "s3:ListBucket"],
            "Resource": [
                format!("arn:aws:s3:::{}", bucket_name),
                format!("arn:aws:s3:::{}/*", bucket_name)
            ],
            "Condition": {
                "StringEquals": { "aws:ResourceAccount": account_id }
            }
        }]
    })
}

pub fn aoss_api_policy(region: &str, account_id: &str, collection_id: &str) -> Value {
    json!({
        "Version": "2012-10-17",
        "Statement": [{
            "Effect": "Allow",
            "Action": ["aoss:APIAccessAll"],
            "Resource": [format!(
                "arn:aws:aoss:{}:{}:collection/{}",
                region, account_id, collection_id
            )]
        }]
    })
}

pub fn encryption_policy(collection_name: &str) -> Value {
    json!({
        "Rules": [{
            "ResourceType": "collection",
            "Resource": [format!("collection/{}", collection_name)]
        }],
        "AWSOwnedKey": true
    })
}

pub fn network_policy(collection_name: &str) -> Value {
    json!([{
        "Rules": [
            {
                "ResourceType": "collection",
                "Resource": [format!("collection/{}", collection_name)]
            },
            {
                "ResourceType": "dashboard",
                "Resource": [format!("collection/{}", collection_name)]
            }
        ],
        "AllowFromPublic": true
    }])
}

/// Grants `principals` full control of the collection and its indexes
pub fn data_access_policy(collection_name: &str, principals: &[String]) -> Value {
    json!([{
        "Rules": [
            {
                "ResourceType": "collection",
                "Resource": [format!("collection/{}", collection_name)],
                "Permission": [
                    "aoss:CreateCollectionItems",
                    "aoss:DeleteCollectionItems",
                    "aoss:UpdateCollectionItems",
                    "aoss:DescribeCollectionItems"
                ]
            },
            {
                "ResourceType": "index",
                "Resource": [format!("index/{}/*", collection_name)],
                "Permission": [
                    "aoss:CreateIndex",
                    "aoss:DeleteIndex",
                    "aoss:UpdateIndex",
                    "aoss:DescribeIndex",
                    "aoss:ReadDocument",
                    "aoss:WriteDocument"
                ]
            }
        ],
        "Principal": principals
    }])
}

/// k-NN index definition matching the knowledge base field mapping
pub fn vector_index_body(dimensions: u32) -> Value {
    json!({
        "settings": {
            "index.knn": "true",
            "number_of_shards": 1,
            "knn.algo_param.ef_search": 512,
            "number_of_replicas": 0
        },
        "mappings": {
            "properties": {
                VECTOR_FIELD: {
                    "type": "knn_vector",
                    "dimension": dimensions,
                    "method": {
                        "name": "hnsw",
                        "engine": "faiss",
                        "space_type": "l2"
                    }
                },
                TEXT_FIELD: { "type": "text" },
                METADATA_FIELD: { "type": "text" }
            }
        }
    })
}
