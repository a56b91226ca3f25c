//! # Tool Path Resolver
//!
//! This module handles finding the external PDF engine in different environments:
//! - Explicit override via environment variable
//! - Bundled next to the executable
//! - System-installed tools

use std::env;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Tools the pipeline knows how to drive
pub const KNOWN_TOOLS: &[&str] = &["qpdf"];

/// Tool path resolver for different deployment environments
pub struct ToolPathResolver {
    /// Base directory where tools are bundled
    tools_dir: Option<PathBuf>,
}

impl ToolPathResolver {
    /// Create a new path resolver
    pub fn new() -> Self {
        Self {
            tools_dir: Self::detect_bundled_tools_dir(),
        }
    }

    /// Create a resolver that looks in a specific bundled tools directory
    pub fn with_tools_dir(tools_dir: impl Into<PathBuf>) -> Self {
        Self {
            tools_dir: Some(tools_dir.into()),
        }
    }

    /// Detect the bundled tools directory
    fn detect_bundled_tools_dir() -> Option<PathBuf> {
        // Strategy 1: TOOLS_DIR environment variable (direct override)
        if let Ok(tools_dir) = env::var("TOOLS_DIR") {
            let tools_path = PathBuf::from(tools_dir);
            debug!("Checking TOOLS_DIR environment variable: {:?}", tools_path);
            if tools_path.exists() {
                return Some(tools_path);
            }
        }

        // Strategy 2: `tools/` next to the executable
        if let Ok(exe_path) = env::current_exe() {
            if let Some(app_dir) = exe_path.parent() {
                let tools_path = app_dir.join("tools");
                debug!("Checking bundled path: {:?}", tools_path);
                if tools_path.exists() {
                    return Some(tools_path);
                }
            }
        }

        debug!("No bundled tools directory found");
        None
    }

    /// Resolve the path to a specific tool
    pub fn resolve_tool(&self, tool_name: &str) -> Option<PathBuf> {
        // Per-tool override, e.g. QPDF_PATH
        let override_var = format!("{}_PATH", tool_name.to_uppercase());
        if let Ok(explicit) = env::var(&override_var) {
            let explicit = PathBuf::from(explicit);
            if explicit.is_file() {
                debug!("Using {} from {}: {:?}", tool_name, override_var, explicit);
                return Some(explicit);
            }
            warn!("{} points to a missing file: {:?}", override_var, explicit);
        }

        if let Some(ref tools_dir) = self.tools_dir {
            let bundled_path = self.get_bundled_tool_path(tools_dir, tool_name);
            if bundled_path.exists() {
                debug!("Using bundled tool: {} -> {:?}", tool_name, bundled_path);
                return Some(bundled_path);
            }
        }

        if let Some(system_path) = self.find_in_system_path(tool_name) {
            debug!("Using system tool: {} -> {:?}", tool_name, system_path);
            return Some(system_path);
        }

        None
    }

    /// Get the expected path for a bundled tool
    fn get_bundled_tool_path(&self, tools_dir: &Path, tool_name: &str) -> PathBuf {
        let platform = if cfg!(target_os = "windows") {
            "windows"
        } else if cfg!(target_os = "linux") {
            "linux"
        } else if cfg!(target_os = "macos") {
            "darwin"
        } else {
            env::consts::OS
        };

        let extension = if cfg!(target_os = "windows") { ".exe" } else { "" };

        // 1. Direct in platform folder: tools/{platform}/{tool_name}
        let direct_path = tools_dir
            .join(platform)
            .join(format!("{}{}", tool_name, extension));

        if direct_path.exists() {
            return direct_path;
        }

        // 2. In tool-specific subfolder: tools/{platform}/{tool_name}/bin/{tool_name}
        let subfolder_path = tools_dir
            .join(platform)
            .join(tool_name)
            .join("bin")
            .join(format!("{}{}", tool_name, extension));

        if subfolder_path.exists() {
            return subfolder_path;
        }

        direct_path
    }

    /// Find tool in system PATH
    fn find_in_system_path(&self, tool_name: &str) -> Option<PathBuf> {
        let extension = if cfg!(windows) { ".exe" } else { "" };
        let tool_with_ext = format!("{}{}", tool_name, extension);

        env::split_paths(&env::var_os("PATH")?)
            .map(|dir| dir.join(&tool_with_ext))
            .find(|path| path.is_file())
    }

    /// Check if a specific tool is available
    pub fn is_tool_available(&self, tool_name: &str) -> bool {
        self.resolve_tool(tool_name).is_some()
    }

    /// Get a report of tool availability
    pub fn get_tools_report(&self) -> String {
        let mut report = String::from("Tool Path Resolver Report\n");
        report.push_str(&format!("Bundled tools dir: {:?}\n", self.tools_dir));

        for tool in KNOWN_TOOLS {
            match self.resolve_tool(tool) {
                Some(path) => report.push_str(&format!("  ✅ {} -> {:?}\n", tool, path)),
                None => report.push_str(&format!(
                    "  ❌ {} (install with: {})\n",
                    tool,
                    Self::install_instructions(tool)
                )),
            }
        }

        report
    }

    /// Installation hint shown when a tool is missing
    pub fn install_instructions(tool_name: &str) -> String {
        match tool_name {
            "qpdf" if cfg!(target_os = "macos") => "brew install qpdf".to_string(),
            "qpdf" if cfg!(target_os = "windows") => "winget install QPDF.QPDF".to_string(),
            _ => format!("sudo apt-get install {}", tool_name),
        }
    }
}

impl Default for ToolPathResolver {
    fn default() -> Self {
        Self::new()
    }
}
