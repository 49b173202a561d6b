use super::{json_pretty, Failure, EXIT_SUCCESS};
use mix_core::Engine;

pub fn run(engine: &Engine, json: bool) -> Result<u8, Failure> {
    let result = engine.init()?;
    if json {
        let payload = serde_json::json!({
            "manifest": result.manifest_path.display().to_string(),
            "lock": result.lock_path.display().to_string(),
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        println!("created {}", result.manifest_path.display());
        println!("created {}", result.lock_path.display());
    }
    Ok(EXIT_SUCCESS)
}
