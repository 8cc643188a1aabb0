use super::{describe, json_pretty, EXIT_SUCCESS};
use dockhand_runtime::Harness;

/// Throwaway foreground run; the container is removed afterwards.
pub fn run(
    harness: &Harness,
    image_tag: &str,
    params: &str,
    command: &[String],
    json: bool,
) -> Result<u8, String> {
    let image = harness.existing_image(image_tag).map_err(|e| describe(&e))?;
    let mut container = harness.container(&image, None).map_err(|e| describe(&e))?;
    let output = container
        .run(&command.join(" "), params)
        .map_err(|e| describe(&e))?;

    if json {
        let out = serde_json::json!({
            "container": container.tag(),
            "image": image_tag,
            "output": output,
        });
        println!("{}", json_pretty(&out)?);
    } else {
        print!("{output}");
    }
    Ok(EXIT_SUCCESS)
}
