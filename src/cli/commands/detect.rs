//! Detect command implementation

use anyhow::Result;

use crate::cli::output::{status, OutputConfig};
use crate::infra::detect::DistroDetector;

/// Execute the detect command
pub fn execute(detector: &dyn DistroDetector, output: &OutputConfig) -> Result<()> {
    let distro = detector.detect()?;
    let supported = distro.validate();

    if output.json {
        let value = serde_json::json!({
            "distro": distro,
            "supported": supported.is_ok(),
            "error": supported.as_ref().err().map(ToString::to_string),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    match supported {
        Ok(family) => println!("{} {distro} (family {})", status::SUCCESS, family.name()),
        Err(e) => println!("{} {distro}: {e}", status::WARNING),
    }
    Ok(())
}
