//! The `transdrill init` command.

use anyhow::Result;

pub fn execute() -> Result<()> {
    if std::path::Path::new("transdrill.toml").exists() {
        println!("transdrill.toml already exists, skipping.");
    } else {
        std::fs::write("transdrill.toml", SAMPLE_CONFIG)?;
        println!("Created transdrill.toml");
    }

    std::fs::create_dir_all("levels")?;
    let example_path = std::path::Path::new("levels/example.toml");
    if example_path.exists() {
        println!("levels/example.toml already exists, skipping.");
    } else {
        std::fs::write(example_path, EXAMPLE_CATALOG)?;
        println!("Created levels/example.toml");
    }

    println!("\nNext steps:");
    println!("  1. Set OPENAI_API_KEY or edit transdrill.toml");
    println!("  2. Run: transdrill validate --levels levels/example.toml");
    println!("  3. Run: transdrill practice --levels levels/example.toml --level 1");

    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# transdrill configuration

model = "gpt-4o-mini"
scoring_temperature = 0.3
generation_temperature = 0.7
pass_threshold = 80
streak_target = 3
# levels_path = "levels"
# progress_path = "progress.json"
# default_topic = "education"

[provider]
type = "openai"
api_key = "${OPENAI_API_KEY}"
"#;

const EXAMPLE_CATALOG: &str = r#"[catalog]
id = "example"
name = "Example Catalog"
description = "Two sentence patterns to get started"

[[levels]]
id = 1
title = "Not only... but also"
description = "Balance two ideas in one sentence."
learning_points = ["Put the same part of speech after 'not only' and 'but also'."]
vocab = ["not only", "but also"]

[levels.challenge]
source_text = "科技不仅改变了我们的工作方式，也改变了我们的生活方式。"
reference_translation = "Technology has changed not only the way we work but also the way we live."
explanation = "not only... but also... links two parallel objects."

[[levels]]
id = 2
title = "It is... that..."
description = "Emphasise the key point with a cleft sentence."
learning_points = ["Move the emphasised element between 'It is' and 'that'."]
vocab = ["it is widely believed", "it is essential that"]

[levels.challenge]
source_text = "正是教育决定了一个国家的未来。"
reference_translation = "It is education that determines the future of a country."
explanation = "The cleft structure highlights 'education' as the focus."
"#;
