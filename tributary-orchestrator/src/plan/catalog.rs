//! Built-in plugin catalog
//!
//! Subtask metadata of the plugins shipped with the platform. Only the
//! parts needed to build plans are described here.

use super::plugin::{
    DOMAIN_TYPE_CICD, DOMAIN_TYPE_CODE, DOMAIN_TYPE_CODE_QUALITY, DOMAIN_TYPE_CODE_REVIEW,
    DOMAIN_TYPE_CROSS, DOMAIN_TYPE_TICKET, OrgProjectMapper, PluginRegistry, ProjectMetricPlugin,
    SubtaskKind::{Collector, Converter, Enricher, Extractor},
    SubtaskMeta, SubtaskPlugin,
};

const CODE: &[&str] = &[DOMAIN_TYPE_CODE];
const TICKET: &[&str] = &[DOMAIN_TYPE_TICKET];
const REVIEW: &[&str] = &[DOMAIN_TYPE_CODE_REVIEW];
const CROSS: &[&str] = &[DOMAIN_TYPE_CROSS];
const CICD: &[&str] = &[DOMAIN_TYPE_CICD];
const QUALITY: &[&str] = &[DOMAIN_TYPE_CODE_QUALITY];
const REVIEW_AND_CROSS: &[&str] = &[DOMAIN_TYPE_CODE_REVIEW, DOMAIN_TYPE_CROSS];

/// Registry holding every built-in plugin
pub fn builtin_registry() -> PluginRegistry {
    let mut registry = PluginRegistry::new();

    registry.register_data_source(github());
    registry.register_data_source(gitlab());
    registry.register_data_source(jira());
    registry.register_data_source(jenkins());
    registry.register_data_source(octopus());
    registry.register_data_source(bitbucket_server());
    registry.register_data_source(circleci());
    registry.register_data_source(sonarqube());
    registry.register_data_source(webhook());

    for metric in ["dora", "refdiff", "issue_trace"] {
        registry.register_metric(ProjectMetricPlugin::new(metric));
    }

    registry.set_project_mapper(OrgProjectMapper);
    registry
}

fn github() -> SubtaskPlugin {
    SubtaskPlugin::new(
        "github",
        vec![
            SubtaskMeta::new("collectApiIssues", Collector, TICKET),
            SubtaskMeta::new("extractApiIssues", Extractor, TICKET),
            SubtaskMeta::new("collectApiPullRequests", Collector, REVIEW),
            SubtaskMeta::new("extractApiPullRequests", Extractor, REVIEW),
            SubtaskMeta::new("collectApiCommits", Collector, CODE),
            SubtaskMeta::new("extractApiCommits", Extractor, CODE),
            SubtaskMeta::new("collectAccounts", Collector, CROSS),
            SubtaskMeta::new("extractAccounts", Extractor, CROSS),
            SubtaskMeta::new("collectRuns", Collector, CICD),
            SubtaskMeta::new("extractRuns", Extractor, CICD),
            SubtaskMeta::new("enrichPullRequestIssues", Enricher, REVIEW_AND_CROSS),
            SubtaskMeta::new("convertRepo", Converter, CODE),
            SubtaskMeta::new("convertIssues", Converter, TICKET),
            SubtaskMeta::new("convertPullRequests", Converter, REVIEW),
            SubtaskMeta::new("convertCommits", Converter, CODE),
            SubtaskMeta::new("convertAccounts", Converter, CROSS),
            SubtaskMeta::new("convertRuns", Converter, CICD),
        ],
    )
    .with_domain_table(DOMAIN_TYPE_CODE, "repos")
    .with_domain_table(DOMAIN_TYPE_TICKET, "boards")
    .with_domain_table(DOMAIN_TYPE_CICD, "cicd_scopes")
}

fn gitlab() -> SubtaskPlugin {
    SubtaskPlugin::new(
        "gitlab",
        vec![
            SubtaskMeta::new("collectApiIssues", Collector, TICKET),
            SubtaskMeta::new("extractApiIssues", Extractor, TICKET),
            SubtaskMeta::new("collectApiMergeRequests", Collector, REVIEW),
            SubtaskMeta::new("extractApiMergeRequests", Extractor, REVIEW),
            SubtaskMeta::new("collectApiCommits", Collector, CODE),
            SubtaskMeta::new("extractApiCommits", Extractor, CODE),
            SubtaskMeta::new("collectApiPipelines", Collector, CICD),
            SubtaskMeta::new("extractApiPipelines", Extractor, CICD),
            SubtaskMeta::new("collectApiJobs", Collector, CICD),
            SubtaskMeta::new("extractApiJobs", Extractor, CICD),
            SubtaskMeta::new("collectAccounts", Collector, CROSS).disabled(),
            SubtaskMeta::new("convertApiProjects", Converter, CODE),
            SubtaskMeta::new("convertApiIssues", Converter, TICKET),
            SubtaskMeta::new("convertApiMergeRequests", Converter, REVIEW),
            SubtaskMeta::new("convertApiCommits", Converter, CODE),
            SubtaskMeta::new("convertPipelines", Converter, CICD),
            SubtaskMeta::new("convertJobs", Converter, CICD),
        ],
    )
    .with_domain_table(DOMAIN_TYPE_CODE, "repos")
    .with_domain_table(DOMAIN_TYPE_TICKET, "boards")
    .with_domain_table(DOMAIN_TYPE_CICD, "cicd_scopes")
}

fn jira() -> SubtaskPlugin {
    SubtaskPlugin::new(
        "jira",
        vec![
            SubtaskMeta::new("collectStatus", Collector, TICKET),
            SubtaskMeta::new("extractStatus", Extractor, TICKET),
            SubtaskMeta::new("collectIssueTypes", Collector, TICKET),
            SubtaskMeta::new("extractIssueType", Extractor, TICKET),
            SubtaskMeta::new("collectIssues", Collector, TICKET),
            SubtaskMeta::new("extractIssues", Extractor, TICKET),
            SubtaskMeta::new("collectIssueChangelogs", Collector, TICKET),
            SubtaskMeta::new("extractIssueChangelogs", Extractor, TICKET),
            SubtaskMeta::new("collectAccounts", Collector, CROSS),
            SubtaskMeta::new("extractAccounts", Extractor, CROSS),
            SubtaskMeta::new("collectSprints", Collector, TICKET),
            SubtaskMeta::new("extractSprints", Extractor, TICKET),
            SubtaskMeta::new("convertBoard", Converter, TICKET),
            SubtaskMeta::new("convertIssues", Converter, TICKET),
            SubtaskMeta::new("convertIssueChangelogs", Converter, TICKET),
            SubtaskMeta::new("convertSprints", Converter, TICKET),
            SubtaskMeta::new("convertAccounts", Converter, CROSS),
        ],
    )
    .with_domain_table(DOMAIN_TYPE_TICKET, "boards")
}

fn jenkins() -> SubtaskPlugin {
    SubtaskPlugin::new(
        "jenkins",
        vec![
            SubtaskMeta::new("collectApiBuilds", Collector, CICD),
            SubtaskMeta::new("extractApiBuilds", Extractor, CICD),
            SubtaskMeta::new("collectApiStages", Collector, CICD),
            SubtaskMeta::new("extractApiStages", Extractor, CICD),
            SubtaskMeta::new("convertBuildsToCicdTasks", Converter, CICD),
            SubtaskMeta::new("convertBuildsToCicdPipelines", Converter, CICD),
        ],
    )
    .with_domain_table(DOMAIN_TYPE_CICD, "cicd_scopes")
    .scope_optional()
}

fn octopus() -> SubtaskPlugin {
    SubtaskPlugin::new(
        "octopus",
        vec![
            SubtaskMeta::new("Collect Projects", Collector, CICD),
            SubtaskMeta::new("Collect Environments", Collector, CICD),
        ],
    )
    .with_domain_table(DOMAIN_TYPE_CICD, "cicd_scopes")
}

fn bitbucket_server() -> SubtaskPlugin {
    SubtaskPlugin::new(
        "bitbucket_server",
        vec![
            SubtaskMeta::new("collectApiPullRequests", Collector, REVIEW),
            SubtaskMeta::new("extractApiPullRequests", Extractor, REVIEW),
            SubtaskMeta::new("convertPullRequests", Converter, REVIEW),
        ],
    )
    .with_domain_table(DOMAIN_TYPE_CODE_REVIEW, "repos")
}

fn circleci() -> SubtaskPlugin {
    SubtaskPlugin::new(
        "circleci",
        vec![
            SubtaskMeta::new("collectPipelines", Collector, CICD),
            SubtaskMeta::new("extractPipelines", Extractor, CICD),
            SubtaskMeta::new("collectJobs", Collector, CICD),
            SubtaskMeta::new("extractJobs", Extractor, CICD),
            SubtaskMeta::new("convertPipelines", Converter, CICD),
            SubtaskMeta::new("convertJobs", Converter, CICD),
        ],
    )
    .with_domain_table(DOMAIN_TYPE_CICD, "cicd_scopes")
}

fn sonarqube() -> SubtaskPlugin {
    SubtaskPlugin::new(
        "sonarqube",
        vec![
            SubtaskMeta::new("CollectIssues", Collector, QUALITY),
            SubtaskMeta::new("ExtractIssues", Extractor, QUALITY),
            SubtaskMeta::new("ConvertIssues", Converter, QUALITY),
        ],
    )
    .with_domain_table(DOMAIN_TYPE_CODE_QUALITY, "cq_projects")
}

/// Webhooks push data in; their plan only converts what was received
fn webhook() -> SubtaskPlugin {
    SubtaskPlugin::new(
        "webhook",
        vec![SubtaskMeta::new("convertDeployments", Converter, CICD)],
    )
    .scope_optional()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry_contents() {
        let registry = builtin_registry();
        assert_eq!(
            registry.data_source_names(),
            vec![
                "bitbucket_server",
                "circleci",
                "github",
                "gitlab",
                "jenkins",
                "jira",
                "octopus",
                "sonarqube",
                "webhook",
            ]
        );
        assert!(registry.metric("dora").is_ok());
        assert!(registry.metric("refdiff").is_ok());
        assert!(registry.project_mapper().is_some());
        assert!(registry.data_source("webhook").unwrap().scope_optional());
        assert!(!registry.data_source("github").unwrap().scope_optional());
    }
}
