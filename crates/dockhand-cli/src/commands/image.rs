use super::{describe, json_pretty, progress, spin_fail, spin_ok, EXIT_SUCCESS};
use dockhand_runtime::{Harness, Image};

pub fn pull(harness: &Harness, source: &str, tag: Option<&str>, json: bool) -> Result<u8, String> {
    let pb = progress(&format!("preparing image from {source}..."), json);
    let image = match harness.image(source, tag) {
        Ok(image) => image,
        Err(e) => {
            if let Some(pb) = &pb {
                spin_fail(pb, "image preparation failed");
            }
            return Err(describe(&e));
        }
    };
    if let Some(pb) = &pb {
        spin_ok(pb, &format!("image {image} ready"));
    }

    if json {
        println!("{}", json_pretty(&summary(&image))?);
    } else {
        println!("{}", image.tag());
    }
    Ok(EXIT_SUCCESS)
}

fn summary(image: &Image) -> serde_json::Value {
    serde_json::json!({
        "tag": image.tag(),
        "original": image.original(),
    })
}

pub fn inspect(harness: &Harness, tag: &str) -> Result<u8, String> {
    let mut image = harness.existing_image(tag).map_err(|e| describe(&e))?;
    let record = image.inspect(false).map_err(|e| describe(&e))?;
    println!("{}", json_pretty(record)?);
    Ok(EXIT_SUCCESS)
}

pub fn remove(
    harness: &Harness,
    tag: &str,
    original: Option<&str>,
    json: bool,
) -> Result<u8, String> {
    let mut image = harness.existing_image(tag).map_err(|e| describe(&e))?;
    if let Some(original) = original {
        image = image.with_original(original);
    }
    image.clean(original.is_some()).map_err(|e| describe(&e))?;

    if json {
        let out = serde_json::json!({ "removed": tag, "original": original });
        println!("{}", json_pretty(&out)?);
    } else {
        println!("removed image {tag}");
    }
    Ok(EXIT_SUCCESS)
}
