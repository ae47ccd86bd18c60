use intake_core::config::{AppConfig, LoadOptions};
use intake_core::{ConfigProvider, FileCatalog, TemplateProvider};
use serde::Serialize;

use super::{escape_json, CommandResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(json_output: bool) -> CommandResult {
    let report = build_report();
    let exit_code = if report.overall_status == CheckStatus::Pass { 0 } else { 1 };

    let output = if json_output {
        serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        })
    } else {
        render_human(&report)
    };

    CommandResult { exit_code, output }
}

fn build_report() -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: format!(
                    "configuration loaded and validated (provider `{}`)",
                    config.llm.provider.as_str()
                ),
            });
            checks.extend(check_catalog(&config));
            checks.push(check_static_assets(&config));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["doc_type_definitions", "doc_type_templates", "static_assets"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

/// Every `*.toml` definition must parse and have a matching template.
fn check_catalog(config: &AppConfig) -> [DoctorCheck; 2] {
    let catalog = FileCatalog::new(&config.documents.config_dir, &config.documents.template_dir);
    let doc_types = catalog.list_doc_types();

    if doc_types.is_empty() {
        return [
            DoctorCheck {
                name: "doc_type_definitions",
                status: CheckStatus::Fail,
                details: format!(
                    "no loadable document types in `{}`",
                    config.documents.config_dir.display()
                ),
            },
            DoctorCheck {
                name: "doc_type_templates",
                status: CheckStatus::Skipped,
                details: "skipped because no document types loaded".to_string(),
            },
        ];
    }

    let broken_configs = definition_stems(config)
        .into_iter()
        .filter_map(|stem| catalog.load_config(&stem).err().map(|error| error.to_string()))
        .collect::<Vec<_>>();
    let definitions = if broken_configs.is_empty() {
        DoctorCheck {
            name: "doc_type_definitions",
            status: CheckStatus::Pass,
            details: format!("{} document type(s) loaded", doc_types.len()),
        }
    } else {
        DoctorCheck {
            name: "doc_type_definitions",
            status: CheckStatus::Fail,
            details: broken_configs.join("; "),
        }
    };

    let missing_templates = doc_types
        .iter()
        .filter_map(|summary| catalog.load_template(&summary.doc_type).err())
        .map(|error| error.to_string())
        .collect::<Vec<_>>();
    let templates = if missing_templates.is_empty() {
        DoctorCheck {
            name: "doc_type_templates",
            status: CheckStatus::Pass,
            details: "every document type has a template".to_string(),
        }
    } else {
        DoctorCheck {
            name: "doc_type_templates",
            status: CheckStatus::Fail,
            details: missing_templates.join("; "),
        }
    };

    [definitions, templates]
}

fn definition_stems(config: &AppConfig) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(&config.documents.config_dir) else {
        return Vec::new();
    };
    let mut stems = entries
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
        .filter_map(|path| path.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
        .collect::<Vec<_>>();
    stems.sort();
    stems
}

fn check_static_assets(config: &AppConfig) -> DoctorCheck {
    let index = config.documents.static_dir.join("index.html");
    if index.is_file() {
        DoctorCheck {
            name: "static_assets",
            status: CheckStatus::Pass,
            details: format!("chat frontend found at `{}`", index.display()),
        }
    } else {
        DoctorCheck {
            name: "static_assets",
            status: CheckStatus::Fail,
            details: format!("missing `{}`", index.display()),
        }
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}
