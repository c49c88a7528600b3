// Unit Tests for Provider Credential Resolution
//
// UNIT UNDER TEST: resolve_credential, resolve_model, capability_report
//
// BUSINESS RESPONSIBILITY:
//   - Decides which provider families are usable from a configuration snapshot
//   - Prefers direct API keys over Azure and Vertex modes
//   - Reports the model identifier recorded with each answer
//   - Summarizes provider availability and fallback edges for operators
//
// TEST COVERAGE:
//   - Mode precedence for gpt and gemini
//   - Incomplete Azure settings
//   - Unavailable reasons
//   - Model resolution per mode
//   - Capability report shape and per-family models

use crate::credentials::{
    capability_report, resolve_all, resolve_credential, resolve_model, AuthMode, ProviderFamily,
};
use crate::tests::helpers::{config_from_pairs, empty_config};

#[cfg(test)]
mod provider_family_tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        // Arrange & Act & Assert
        assert_eq!(" GPT ".parse::<ProviderFamily>(), Ok(ProviderFamily::Gpt));
        assert_eq!("Gemini".parse::<ProviderFamily>(), Ok(ProviderFamily::Gemini));
        assert!("claude".parse::<ProviderFamily>().is_err());
    }

    #[test]
    fn test_serializes_lowercase() {
        // Arrange & Act
        let json = serde_json::to_string(&ProviderFamily::Perplexity).unwrap();

        // Assert
        assert_eq!(json, "\"perplexity\"");
    }
}

#[cfg(test)]
mod gpt_resolution_tests {
    use super::*;

    #[test]
    fn test_openai_key_wins_over_azure() {
        // Arrange
        let config = config_from_pairs(&[
            ("OPENAI_API_KEY", "sk"),
            ("AZURE_OPENAI_ENDPOINT", "https://acme.openai.azure.com"),
            ("AZURE_OPENAI_DEPLOYMENT", "gpt4o"),
            ("AZURE_OPENAI_API_KEY", "az"),
        ]);

        // Act
        let credential = resolve_credential(ProviderFamily::Gpt, &config);

        // Assert
        assert!(credential.available);
        assert_eq!(credential.mode, AuthMode::OpenaiApiKey);
        assert!(credential.reason.is_none());
    }

    #[test]
    fn test_azure_access_token_selects_oauth_mode() {
        // Arrange
        let config = config_from_pairs(&[
            ("AZURE_OPENAI_ENDPOINT", "https://acme.openai.azure.com"),
            ("AZURE_OPENAI_DEPLOYMENT", "gpt4o"),
            ("AZURE_OPENAI_API_KEY", "az"),
            ("AZURE_OPENAI_ACCESS_TOKEN", "bearer"),
        ]);

        // Act
        let credential = resolve_credential(ProviderFamily::Gpt, &config);

        // Assert
        assert_eq!(credential.mode, AuthMode::AzureOpenaiOauth);
    }

    #[test]
    fn test_azure_without_deployment_is_unavailable() {
        // Arrange
        let config = config_from_pairs(&[
            ("AZURE_OPENAI_ENDPOINT", "https://acme.openai.azure.com"),
            ("AZURE_OPENAI_API_KEY", "az"),
        ]);

        // Act
        let credential = resolve_credential(ProviderFamily::Gpt, &config);

        // Assert
        assert!(!credential.available);
        assert_eq!(credential.mode, AuthMode::Unavailable);
        assert_eq!(
            credential.reason.as_deref(),
            Some("Set OPENAI_API_KEY or Azure OpenAI credentials")
        );
    }
}

#[cfg(test)]
mod gemini_and_perplexity_resolution_tests {
    use super::*;

    #[test]
    fn test_gemini_key_wins_over_vertex() {
        // Arrange
        let config = config_from_pairs(&[
            ("GEMINI_API_KEY", "gm"),
            ("VERTEX_PROJECT_ID", "proj"),
            ("GOOGLE_APPLICATION_CREDENTIALS", "/tmp/sa.json"),
        ]);

        // Act
        let credential = resolve_credential(ProviderFamily::Gemini, &config);

        // Assert
        assert_eq!(credential.mode, AuthMode::GeminiApiKey);
    }

    #[test]
    fn test_vertex_markers_select_oauth_mode() {
        // Arrange
        let config = config_from_pairs(&[
            ("VERTEX_PROJECT_ID", "proj"),
            ("GOOGLE_APPLICATION_CREDENTIALS", "/tmp/sa.json"),
        ]);

        // Act
        let credential = resolve_credential(ProviderFamily::Gemini, &config);

        // Assert
        assert!(credential.available);
        assert_eq!(credential.mode, AuthMode::VertexAiOauth);
    }

    #[test]
    fn test_all_unavailable_on_empty_config() {
        // Arrange
        let config = empty_config();

        // Act
        let credentials = resolve_all(&config);

        // Assert
        assert_eq!(credentials.len(), 3);
        assert!(credentials.iter().all(|c| !c.available && c.reason.is_some()));
        assert_eq!(credentials[2].reason.as_deref(), Some("Set PERPLEXITY_API_KEY"));
    }
}

#[cfg(test)]
mod model_resolution_tests {
    use super::*;

    #[test]
    fn test_azure_mode_reports_deployment() {
        // Arrange
        let config = config_from_pairs(&[
            ("AZURE_OPENAI_ENDPOINT", "https://acme.openai.azure.com"),
            ("AZURE_OPENAI_DEPLOYMENT", "prod-gpt4o"),
            ("AZURE_OPENAI_API_KEY", "az"),
        ]);
        let credential = resolve_credential(ProviderFamily::Gpt, &config);

        // Act
        let model = resolve_model(&credential, &config);

        // Assert
        assert_eq!(model, "prod-gpt4o");
    }

    #[test]
    fn test_direct_modes_report_configured_models() {
        // Arrange
        let config = config_from_pairs(&[
            ("OPENAI_API_KEY", "sk"),
            ("OPENAI_MODEL", "gpt-5-mini"),
            ("GEMINI_API_KEY", "gm"),
            ("PERPLEXITY_API_KEY", "pp"),
        ]);

        // Act
        let models: Vec<String> = resolve_all(&config)
            .iter()
            .map(|credential| resolve_model(credential, &config))
            .collect();

        // Assert
        assert_eq!(models, vec!["gpt-5-mini", "gemini-2.5-flash", "sonar"]);
    }
}

#[cfg(test)]
mod capability_report_tests {
    use super::*;

    #[test]
    fn test_report_lists_every_family_and_fallback_edges() {
        // Arrange
        let config = config_from_pairs(&[("PERPLEXITY_API_KEY", "pp")]);

        // Act
        let report = capability_report(&config);

        // Assert
        assert_eq!(report.providers.len(), 3);
        assert!(report.providers[&ProviderFamily::Perplexity].available);
        assert!(!report.providers[&ProviderFamily::Gpt].available);
        assert_eq!(
            report.providers[&ProviderFamily::Gpt].subscription_oauth_supported,
            Some(false)
        );
        assert!(report.providers[&ProviderFamily::Perplexity].notes.is_none());
        assert_eq!(
            report.fallback,
            vec!["gpt_to_gemini", "gemini_to_gpt", "perplexity_to_gemini"]
        );
    }

    #[test]
    fn test_report_serializes_with_lowercase_keys() {
        // Arrange
        let report = capability_report(&empty_config());

        // Act
        let json = serde_json::to_value(&report).unwrap();

        // Assert
        assert_eq!(json["providers"]["gemini"]["mode"], "unavailable");
        assert_eq!(json["providers"]["gemini"]["available"], false);
        assert!(json["providers"]["perplexity"].get("notes").is_none());
        assert!(json["providers"]["gemini"].get("model").is_none());
    }

    #[test]
    fn test_report_names_model_for_available_families() {
        // Arrange
        let config = config_from_pairs(&[
            ("AZURE_OPENAI_ENDPOINT", "https://acme.openai.azure.com"),
            ("AZURE_OPENAI_DEPLOYMENT", "prod-gpt4o"),
            ("AZURE_OPENAI_API_KEY", "az"),
            ("GEMINI_API_KEY", "gm"),
        ]);

        // Act
        let report = capability_report(&config);

        // Assert
        assert_eq!(
            report.providers[&ProviderFamily::Gpt].model.as_deref(),
            Some("prod-gpt4o")
        );
        assert_eq!(
            report.providers[&ProviderFamily::Gemini].model.as_deref(),
            Some("gemini-2.5-flash")
        );
        assert_eq!(report.providers[&ProviderFamily::Perplexity].model, None);
    }
}
