use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
pub enum Language {
    #[default]
    Python,
    #[value(name = "javascript")]
    JavaScript,
    #[value(name = "typescript")]
    TypeScript,
}

impl Language {
    pub fn label(&self) -> &'static str {
        match self {
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Every app type either profile can emit. Serialized with the display labels
/// so the stored draft reads the same as what the user picked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
pub enum AppType {
    #[default]
    #[serde(rename = "Web App")]
    WebApp,
    #[serde(rename = "API Backend")]
    ApiBackend,
    #[serde(rename = "CLI Tool")]
    CliTool,
    #[serde(rename = "Data Analysis Script")]
    DataAnalysisScript,
    #[serde(rename = "ML Pipeline")]
    MlPipeline,
    #[serde(rename = "Automation Script")]
    AutomationScript,
    #[serde(rename = "Scraper")]
    Scraper,
    #[serde(rename = "Chatbot")]
    Chatbot,
    #[serde(rename = "Mobile App UI")]
    MobileAppUi,
    #[serde(rename = "Mobile App")]
    MobileApp,
    #[serde(rename = "Desktop App")]
    DesktopApp,
}

impl AppType {
    pub fn label(&self) -> &'static str {
        match self {
            AppType::WebApp => "Web App",
            AppType::ApiBackend => "API Backend",
            AppType::CliTool => "CLI Tool",
            AppType::DataAnalysisScript => "Data Analysis Script",
            AppType::MlPipeline => "ML Pipeline",
            AppType::AutomationScript => "Automation Script",
            AppType::Scraper => "Scraper",
            AppType::Chatbot => "Chatbot",
            AppType::MobileAppUi => "Mobile App UI",
            AppType::MobileApp => "Mobile App",
            AppType::DesktopApp => "Desktop App",
        }
    }
}

impl fmt::Display for AppType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which app-type rule table the classifier runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierProfile {
    /// Broad categories: backends, CLIs, data scripts, bots, ...
    #[default]
    General,
    /// Platform keywords only: mobile, desktop, web.
    #[value(alias = "platform-only")]
    Platform,
}

/// A first-match-wins keyword rule.
pub struct Rule<T: 'static> {
    pub keywords: &'static [&'static str],
    pub label: T,
}

const LANGUAGE_RULES: &[Rule<Language>] = &[
    Rule { keywords: &["javascript", "react", "nextjs", "node"], label: Language::JavaScript },
    Rule { keywords: &["typescript", "ts"], label: Language::TypeScript },
];

const GENERAL_APP_RULES: &[Rule<AppType>] = &[
    Rule { keywords: &["api", "backend", "server"], label: AppType::ApiBackend },
    Rule { keywords: &["cli", "command line"], label: AppType::CliTool },
    Rule { keywords: &["data", "analysis"], label: AppType::DataAnalysisScript },
    Rule { keywords: &["ml", "machine learning", "model"], label: AppType::MlPipeline },
    Rule { keywords: &["automation", "task"], label: AppType::AutomationScript },
    Rule { keywords: &["scrape", "crawler"], label: AppType::Scraper },
    Rule { keywords: &["chat", "bot"], label: AppType::Chatbot },
    Rule { keywords: &["web", "app", "site"], label: AppType::WebApp },
];

const PLATFORM_APP_RULES: &[Rule<AppType>] = &[
    Rule { keywords: &["mobile", "ios", "android", "phone", "tablet"], label: AppType::MobileApp },
    Rule { keywords: &["desktop", "windows", "macos", "linux app"], label: AppType::DesktopApp },
    Rule { keywords: &["web", "app", "site", "browser"], label: AppType::WebApp },
];

impl ClassifierProfile {
    pub fn app_rules(&self) -> &'static [Rule<AppType>] {
        match self {
            ClassifierProfile::General => GENERAL_APP_RULES,
            ClassifierProfile::Platform => PLATFORM_APP_RULES,
        }
    }

    /// App types offered for manual selection under this profile.
    pub fn app_types(&self) -> &'static [AppType] {
        match self {
            ClassifierProfile::General => &[
                AppType::WebApp,
                AppType::ApiBackend,
                AppType::CliTool,
                AppType::DataAnalysisScript,
                AppType::MlPipeline,
                AppType::AutomationScript,
                AppType::Scraper,
                AppType::Chatbot,
                AppType::MobileAppUi,
                AppType::DesktopApp,
            ],
            ClassifierProfile::Platform => &[AppType::WebApp, AppType::MobileApp, AppType::DesktopApp],
        }
    }
}

fn first_match<T: Copy + 'static>(rules: &[Rule<T>], text: &str, fallback: T) -> T {
    let lower = text.to_lowercase();
    rules
        .iter()
        .find(|r| r.keywords.iter().any(|k| lower.contains(*k)))
        .map(|r| r.label)
        .unwrap_or(fallback)
}

pub fn detect_language(text: &str) -> Language {
    first_match(LANGUAGE_RULES, text, Language::Python)
}

pub fn detect_app_type(text: &str, profile: ClassifierProfile) -> AppType {
    first_match(profile.app_rules(), text, AppType::WebApp)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub language: Language,
    #[serde(rename = "appType")]
    pub app_type: AppType,
}

pub fn classify(text: &str, profile: ClassifierProfile) -> Detection {
    Detection {
        language: detect_language(text),
        app_type: detect_app_type(text, profile),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn react_always_means_javascript() {
        for text in [
            "react dashboard",
            "A REACT app written in TypeScript",
            "typescript + React frontend with a python api",
            "ReAcT",
        ] {
            assert_eq!(detect_language(text), Language::JavaScript, "{text}");
        }
    }

    #[test]
    fn language_falls_back_to_python() {
        assert_eq!(detect_language(""), Language::Python);
        assert_eq!(detect_language("a quiz for kids"), Language::Python);
    }

    #[test]
    fn ts_substring_matches_typescript() {
        // "ts" is a bare substring rule, so words like "charts" hit it too
        assert_eq!(detect_language("Build charts"), Language::TypeScript);
        assert_eq!(detect_language("TypeScript service"), Language::TypeScript);
    }

    #[test]
    fn general_app_types() {
        let p = ClassifierProfile::General;
        assert_eq!(detect_app_type("Build a REST API backend", p), AppType::ApiBackend);
        assert_eq!(detect_app_type("quiz app", p), AppType::WebApp);
        assert_eq!(detect_app_type("a command line todo", p), AppType::CliTool);
        assert_eq!(detect_app_type("crawler for news", p), AppType::Scraper);
        assert_eq!(detect_app_type("discord bot", p), AppType::Chatbot);
        assert_eq!(detect_app_type("", p), AppType::WebApp);
    }

    #[test]
    fn general_rule_order_wins() {
        // "server" is checked before "data"
        assert_eq!(
            detect_app_type("data server", ClassifierProfile::General),
            AppType::ApiBackend
        );
        // "model" is checked before "bot"
        assert_eq!(
            detect_app_type("a chatbot model", ClassifierProfile::General),
            AppType::MlPipeline
        );
    }

    #[test]
    fn platform_profile_is_separate() {
        let p = ClassifierProfile::Platform;
        assert_eq!(detect_app_type("iOS habit tracker", p), AppType::MobileApp);
        assert_eq!(detect_app_type("macOS menu bar tool", p), AppType::DesktopApp);
        assert_eq!(detect_app_type("Build a REST API backend", p), AppType::WebApp);
        assert_eq!(detect_app_type("", p), AppType::WebApp);
    }

    #[test]
    fn results_are_closed_and_stable() {
        for text in ["", "   ", "python scraper", "ml model api", "日本語のアプリ"] {
            for profile in [ClassifierProfile::General, ClassifierProfile::Platform] {
                let a = classify(text, profile);
                let b = classify(text, profile);
                assert_eq!(a, b);
                assert!(matches!(
                    a.language,
                    Language::Python | Language::JavaScript | Language::TypeScript
                ));
                assert!(
                    profile.app_types().contains(&a.app_type),
                    "{:?} not offered by {:?}",
                    a.app_type,
                    profile
                );
            }
        }
    }

    #[test]
    fn labels_serialize_as_display_names() {
        let d = classify("Build a simple REST API in TypeScript", ClassifierProfile::General);
        let v = serde_json::to_value(d).unwrap();
        assert_eq!(v["language"], "TypeScript");
        assert_eq!(v["appType"], "API Backend");
    }
}
