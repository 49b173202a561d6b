use super::{json_pretty, plan_lines, Failure, EXIT_SUCCESS, NO_MANIFESTS, UP_TO_DATE};
use mix_core::Engine;

pub fn run(engine: &Engine, json: bool) -> Result<u8, Failure> {
    let Some(planned) = engine.plan()? else {
        if json {
            println!("{}", json_pretty(&serde_json::json!({ "manifests": [] }))?);
        } else {
            println!("{NO_MANIFESTS}");
        }
        return Ok(EXIT_SUCCESS);
    };

    if json {
        let sources: Vec<&str> = planned.documents.iter().map(|d| d.source.as_str()).collect();
        let payload = serde_json::json!({
            "manifests": sources,
            "plan": planned.plan,
        });
        println!("{}", json_pretty(&payload)?);
    } else if planned.plan.is_empty() {
        println!("{UP_TO_DATE}");
    } else {
        for line in plan_lines(&planned.plan) {
            println!("{line}");
        }
        println!("{} action(s) pending", planned.plan.len());
    }
    Ok(EXIT_SUCCESS)
}
