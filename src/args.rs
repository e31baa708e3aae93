use clap::Parser;
use qa_scan::QaConfig;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "qa-scan")]
#[command(about = "Pre-release QA crawler that discovers pages and reports SEO, accessibility, content and visual issues")]
#[command(version)]
pub struct Args {
    /// Beta site URL to crawl
    #[arg(required_unless_present = "resume")]
    pub url: Option<String>,

    /// Live site URL used for screenshot and availability comparison
    #[arg(long)]
    pub live: Option<String>,

    /// Project name (defaults to the host of the URL)
    #[arg(short, long)]
    pub name: Option<String>,

    /// JSON configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Maximum number of link hops from the seed URL
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Maximum number of discovered pages
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Number of pages analyzed concurrently
    #[arg(short, long)]
    pub concurrency: Option<usize>,

    /// Directory holding scan state and the last report
    #[arg(long, default_value = ".qa-scan")]
    pub store: PathBuf,

    /// Run grammar checks against the grammar service
    #[arg(long)]
    pub grammar: bool,

    /// Skip screenshot capture
    #[arg(long)]
    pub no_visual: bool,

    /// Write an exported JSON report into this directory
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Resume the scan saved in the store instead of starting a new one
    #[arg(long)]
    pub resume: bool,
}

impl Args {
    /// Apply command-line overrides on top of the loaded configuration
    pub fn apply_to(&self, config: &mut QaConfig) {
        if let Some(depth) = self.depth {
            config.scan.discovery_depth = depth;
        }
        if let Some(max_pages) = self.max_pages {
            config.scan.max_pages = max_pages;
        }
        if let Some(concurrency) = self.concurrency {
            config.scan.concurrent_scans = concurrency.max(1);
        }
        if self.grammar {
            config.checks.check_grammar = true;
        }
        if self.no_visual {
            config.checks.check_visual_quality = false;
        }
    }

    /// Name for the project, falling back to the URL host
    pub fn project_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        self.url
            .as_deref()
            .and_then(|u| url::Url::parse(u).ok())
            .and_then(|u| u.host_str().map(str::to_string))
            .unwrap_or_else(|| "QA Scan".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "qa-scan",
            "https://beta.example.com",
            "--depth",
            "1",
            "--concurrency",
            "0",
            "--grammar",
            "--no-visual",
        ])
        .unwrap();

        let mut config = QaConfig::default();
        args.apply_to(&mut config);
        assert_eq!(config.scan.discovery_depth, 1);
        assert_eq!(config.scan.concurrent_scans, 1);
        assert!(config.checks.check_grammar);
        assert!(!config.checks.check_visual_quality);
        assert_eq!(args.project_name(), "beta.example.com");
    }

    #[test]
    fn test_url_required_unless_resuming() {
        assert!(Args::try_parse_from(["qa-scan"]).is_err());
        let args = Args::try_parse_from(["qa-scan", "--resume"]).unwrap();
        assert!(args.url.is_none());
    }
}
