use std::sync::Arc;

use webstorage::host::Host;
use webstorage::plugin::{GlobalProperties, StoragePlugin};
use webstorage::storage::listener;
use webstorage::StorageOptions;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let host = Host::builder().build();
    let left = host.open_window("https://example.com/left")?;
    let right = host.open_window("https://example.com/right")?;

    let options = StorageOptions::builder().namespace("demo:").build()?;

    let mut left_globals = GlobalProperties::default();
    StoragePlugin::new(left).install(&mut left_globals, &options)?;
    let mut right_globals = GlobalProperties::default();
    StoragePlugin::new(right).install(&mut right_globals, &options)?;

    let left_ls = left_globals.get("$ls").map(Arc::clone).ok_or_else(|| anyhow::anyhow!("$ls not installed"))?;
    let right_ls = right_globals.get("$ls").map(Arc::clone).ok_or_else(|| anyhow::anyhow!("$ls not installed"))?;

    right_ls.on("counter", listener(|new, old, url| {
        println!("counter changed: {old:?} -> {new:?} (from {})", url.unwrap_or("?"));
    }));

    for i in 0..3 {
        left_ls.set("counter", &i, None)?;
    }
    left_ls.set("flash", "short lived", Some(1))?;

    println!("right sees counter = {:?}", right_ls.get::<i32>("counter"));
    println!("right sees flash = {:?}", right_ls.get::<String>("flash"));
    Ok(())
}
