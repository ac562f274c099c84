use std::process::{Command, Stdio};

use anyhow::{anyhow, Context, Result};

pub const URL_PLACEHOLDER: &str = "%URL%";

/// Opens a thread address somewhere outside the terminal. Fire and forget:
/// an error only means the launch itself failed.
pub trait Viewer: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct SystemBrowser;

impl Viewer for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        webbrowser::open(url).with_context(|| format!("open {url} in browser"))
    }
}

/// Runs a user supplied command, e.g. `["firefox", "--new-tab", "%URL%"]`.
/// The URL is appended when the template has no placeholder.
#[derive(Debug, Clone)]
pub struct CommandViewer {
    program: String,
    args: Vec<String>,
}

impl CommandViewer {
    pub fn new(template: &[String]) -> Result<Self> {
        let (program, args) = template
            .split_first()
            .ok_or_else(|| anyhow!("viewer command is empty"))?;
        if program.trim().is_empty() {
            return Err(anyhow!("viewer program missing"));
        }
        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn args_for(&self, url: &str) -> Vec<String> {
        let mut args: Vec<String> = self
            .args
            .iter()
            .map(|arg| arg.replace(URL_PLACEHOLDER, url))
            .collect();
        if !self.args.iter().any(|arg| arg.contains(URL_PLACEHOLDER)) {
            args.push(url.to_string());
        }
        args
    }
}

impl Viewer for CommandViewer {
    fn open(&self, url: &str) -> Result<()> {
        let mut command = Command::new(&self.program);
        command.args(self.args_for(url));
        command.stdin(Stdio::null());
        command.stdout(Stdio::null());
        command.stderr(Stdio::null());
        command
            .spawn()
            .with_context(|| format!("launch {} for {url}", self.program))?;
        Ok(())
    }
}

pub fn from_config(cfg: &crate::config::ViewerConfig) -> Result<Box<dyn Viewer>> {
    if cfg.command.is_empty() {
        Ok(Box::new(SystemBrowser))
    } else {
        Ok(Box::new(CommandViewer::new(&cfg.command)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|part| part.to_string()).collect()
    }

    #[test]
    fn substitutes_placeholder() {
        let viewer = CommandViewer::new(&template(&["lynx", "-dump", "%URL%"])).unwrap();
        assert_eq!(viewer.args_for("http://a.test/b/thread/1"), vec!["-dump", "http://a.test/b/thread/1"]);
    }

    #[test]
    fn appends_url_without_placeholder() {
        let viewer = CommandViewer::new(&template(&["open"])).unwrap();
        assert_eq!(viewer.args_for("http://a.test"), vec!["http://a.test"]);
    }

    #[test]
    fn rejects_empty_template() {
        assert!(CommandViewer::new(&[]).is_err());
        assert!(CommandViewer::new(&template(&[" "])).is_err());
    }
}
