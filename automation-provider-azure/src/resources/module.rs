//! automation_module
//!
//! Importing a module keeps running after the PUT returns; the resource is
//! only usable once its provisioning state reaches `Succeeded`.

use std::collections::HashMap;

use automation_core::provider::{ProviderResult, ResourceType};
use automation_core::resource::Attributes;
use automation_core::schema::{AttributeSchema, AttributeType, ResourceSchema};
use serde::Deserialize;
use serde_json::json;

use super::{ArmRequest, AutomationResource, account_scoped, decode, scoped_id};
use crate::config::ProviderConfig;
use crate::polling::ProvisioningSpec;
use crate::utils::{prune_nulls, set_account_scope};

/// Stages a module import passes through
pub const IMPORT_STAGES: &[&str] = &[
    "ActivitiesStored",
    "Created",
    "Creating",
    "StartingImportModuleRunbook",
    "RunningImportModuleRunbook",
    "ContentRetrieved",
    "ContentDownloaded",
    "ContentValidated",
    "ConnectionTypeImported",
    "ContentStored",
    "ModuleDataStored",
    "ModuleImportRunbookComplete",
];

pub struct ModuleType;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct Module {
    name: String,
    resource_group_name: String,
    automation_account_name: String,
    module_link: ModuleLink,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ModuleLink {
    uri: String,
    hash: Option<ContentHash>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContentHash {
    algorithm: String,
    value: String,
}

impl ResourceType for ModuleType {
    fn name(&self) -> &'static str {
        "automation_module"
    }

    fn schema(&self) -> ResourceSchema {
        let hash = AttributeType::Struct {
            name: "ContentHash".to_string(),
            fields: vec![
                AttributeSchema::new("algorithm", AttributeType::String).required(),
                AttributeSchema::new("value", AttributeType::String).required(),
            ],
        };

        account_scoped(ResourceSchema::new(self.name()))
            .with_description("PowerShell module imported into an Automation account")
            .attribute(
                AttributeSchema::new(
                    "module_link",
                    AttributeType::Struct {
                        name: "ModuleLink".to_string(),
                        fields: vec![
                            AttributeSchema::new("uri", AttributeType::String).required(),
                            AttributeSchema::new("hash", hash),
                        ],
                    },
                )
                .required()
                .write_only()
                .with_description("Package to import; not reported back by the API"),
            )
    }
}

impl AutomationResource for ModuleType {
    fn prepare(
        &self,
        attributes: &Attributes,
        config: &ProviderConfig,
    ) -> ProviderResult<ArmRequest> {
        let module: Module = decode(&self.schema(), attributes)?;

        let content_hash = module.module_link.hash.map(|h| {
            json!({
                "algorithm": h.algorithm,
                "value": h.value,
            })
        });
        let body = prune_nulls(json!({
            "properties": {
                "contentLink": {
                    "uri": module.module_link.uri,
                    "contentHash": content_hash,
                }
            }
        }));

        Ok(ArmRequest::new(
            scoped_id(
                config,
                &module.resource_group_name,
                &module.automation_account_name,
                "modules",
                &module.name,
            ),
            body,
        ))
    }

    fn flatten(&self, id: &str, _body: &serde_json::Value) -> Attributes {
        let mut attributes = HashMap::new();
        set_account_scope(&mut attributes, id);
        attributes
    }

    fn provisioning(&self) -> Option<ProvisioningSpec> {
        Some(ProvisioningSpec {
            target: "Succeeded",
            pending: IMPORT_STAGES,
            failed: &["Failed"],
        })
    }
}
