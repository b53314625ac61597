use crate::cli::{open_container, print_json, GlobalArgs};

pub fn run(globals: &GlobalArgs) -> anyhow::Result<()> {
    let container = open_container(globals, false);

    let Some(manifest) = container.artifacts.read_manifest()? else {
        println!("No index found. Run 'kdd index <specs_path>' to create one.");
        return Ok(());
    };

    print_json(&manifest)?;
    Ok(())
}
