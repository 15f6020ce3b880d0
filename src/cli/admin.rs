//! Admin command - deploy, check or delete the knowledge base

use std::io::{self, Write};
use std::path::Path;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::{AdminAction, AdminArgs};
use crate::config::KnowledgeBaseConfig;
use crate::domain::knowledge_base::{DeleteOptions, KnowledgeBaseStatus};
use crate::infrastructure::services::KnowledgeBaseDeployer;

/// Run one admin action, returning whether it succeeded
pub async fn run(args: AdminArgs) -> anyhow::Result<bool> {
    let mut config = super::bootstrap();
    if let Some(path) = &args.config {
        config.knowledge_base.config_path = path.display().to_string();
    }

    let mut out = io::stdout();
    writeln!(out, "Knowledge Base Management Tool")?;
    writeln!(out, "{}", "=".repeat(50))?;

    let kb_path = Path::new(&config.knowledge_base.config_path);
    writeln!(out, "Loading configuration from {}", kb_path.display())?;

    let kb = match KnowledgeBaseConfig::load(kb_path) {
        Ok(kb) => kb,
        Err(e) => {
            writeln!(out, "Error: {}", e)?;
            return finish(&mut out, false);
        }
    };

    let confirmed = match args.action {
        AdminAction::Delete if !args.yes => confirm_delete(&mut out, &kb.name).await?,
        _ => true,
    };
    if !confirmed {
        writeln!(out, "Deletion cancelled")?;
        return finish(&mut out, false);
    }

    let context = match crate::create_app_context(&config).await {
        Ok(context) => context,
        Err(e) => {
            writeln!(out, "Error initializing AWS clients: {}", e)?;
            return finish(&mut out, false);
        }
    };

    let success = match args.action {
        AdminAction::Deploy => {
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("Interrupted, cancelling synchronization");
                    on_interrupt.cancel();
                }
            });

            deploy(&context.deployer, &kb, &cancel, &mut out).await?
        }
        AdminAction::Status => status(&context.deployer, &kb.name, &mut out).await?,
        AdminAction::Delete => delete(&context.deployer, &kb.name, &mut out).await?,
    };

    finish(&mut out, success)
}

fn finish(out: &mut impl Write, success: bool) -> anyhow::Result<bool> {
    if success {
        writeln!(out, "\nOperation completed successfully!")?;
    } else {
        writeln!(out, "\nOperation failed!")?;
    }
    Ok(success)
}

async fn confirm_delete(out: &mut impl Write, kb_name: &str) -> io::Result<bool> {
    write!(
        out,
        "Are you sure you want to delete Knowledge Base '{}' and ALL associated resources? (yes/no): ",
        kb_name
    )?;
    out.flush()?;

    let mut answer = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut answer)
        .await?;

    Ok(is_confirmation(&answer))
}

fn is_confirmation(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}

/// Create or reuse, upload, synchronize and record the knowledge base
pub async fn deploy(
    deployer: &KnowledgeBaseDeployer,
    kb: &KnowledgeBaseConfig,
    cancel: &CancellationToken,
    out: &mut impl Write,
) -> io::Result<bool> {
    writeln!(out, "Configuration loaded successfully")?;
    writeln!(out, "   Knowledge Base Name: {}", kb.name)?;
    writeln!(out, "   Description: {}", kb.description)?;
    writeln!(out, "Creating or retrieving Knowledge Base (this may take a few minutes)...")?;

    let outcome = match deployer.deploy(kb, cancel).await {
        Ok(outcome) => outcome,
        Err(e) => {
            writeln!(out, "Error during deployment: {}", e)?;
            return Ok(false);
        }
    };

    writeln!(out, "Knowledge Base ready!")?;
    writeln!(out, "   Knowledge Base ID: {}", outcome.handle.id)?;
    writeln!(out, "   Data Source ID: {}", outcome.data_source_id())?;

    match &outcome.documents {
        None => {
            writeln!(
                out,
                "Warning: Documents directory not found at {}",
                kb.document_directory_path.display()
            )?;
            writeln!(out, "Knowledge Base created but no documents uploaded.")?;
            return Ok(true);
        }
        Some(report) => {
            writeln!(out, "Uploaded {} documents", report.uploaded.len())?;
            writeln!(out, "Data synchronization completed")?;
        }
    }

    if outcome.parameter_recorded {
        writeln!(out, "Knowledge Base ID stored in SSM")?;
    } else {
        writeln!(out, "Warning: Could not store KB ID in SSM")?;
    }

    writeln!(out, "\nKnowledge Base deployment completed successfully!")?;
    writeln!(
        out,
        "   You can now query the knowledge base using KB ID: {}",
        outcome.handle.id
    )?;
    writeln!(
        out,
        "   Try asking questions about academic calendar, rules, graduation, or FAQ topics."
    )?;

    Ok(true)
}

/// Print the knowledge base details; fails when it does not exist
pub async fn status(
    deployer: &KnowledgeBaseDeployer,
    kb_name: &str,
    out: &mut impl Write,
) -> io::Result<bool> {
    writeln!(out, "Checking Knowledge Base status...")?;

    let details = match deployer.status(kb_name).await {
        Ok(details) => details,
        Err(e) if e.is_not_found() => {
            writeln!(out, "Knowledge Base '{}' not found", kb_name)?;
            return Ok(false);
        }
        Err(e) => {
            writeln!(out, "Error checking status: {}", e)?;
            return Ok(false);
        }
    };

    writeln!(out, "\nKnowledge Base Status:")?;
    writeln!(out, "   Name: {}", details.name)?;
    writeln!(out, "   ID: {}", details.id)?;
    writeln!(out, "   Status: {}", details.status)?;
    writeln!(out, "   Description: {}", details.description_or_default())?;
    writeln!(out, "   Created: {}", details.created_display())?;
    writeln!(out, "   Updated: {}", details.updated_display())?;

    if details.status == KnowledgeBaseStatus::Active {
        writeln!(out, "Knowledge Base is ready for queries!")?;
    } else {
        writeln!(
            out,
            "Knowledge Base status is {} - it may not be ready for queries yet",
            details.status
        )?;
    }

    Ok(true)
}

/// Delete the knowledge base with every provisioned resource
pub async fn delete(
    deployer: &KnowledgeBaseDeployer,
    kb_name: &str,
    out: &mut impl Write,
) -> io::Result<bool> {
    writeln!(out, "Deleting Knowledge Base and associated resources...")?;

    match deployer.teardown(kb_name, DeleteOptions::everything()).await {
        Ok(parameter_removed) => {
            if parameter_removed {
                writeln!(out, "SSM parameter removed")?;
            } else {
                writeln!(out, "SSM parameter may not have existed")?;
            }
            writeln!(
                out,
                "Knowledge Base '{}' and all associated resources deleted successfully!",
                kb_name
            )?;
            Ok(true)
        }
        Err(e) => {
            writeln!(out, "Error deleting Knowledge Base: {}", e)?;
            Ok(false)
        }
    }
}
