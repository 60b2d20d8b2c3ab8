//! End-to-end walkthrough: one item type, one repository, the full query
//! surface.
//!
//! Run with:
//! ```sh
//! cargo run --example quickstart
//! ```

use repokit::prelude::*;

#[derive(Clone, Debug, Serialize, Deserialize)]
struct Person {
    id: String,
    name: String,
    age: i64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let repo: MemoryRepo<Person> = MemoryRepo::with_id_field("id");

    for (id, name, age) in [("1", "Jack", 30), ("2", "John", 33), ("3", "James", 36)] {
        repo.insert(&Person {
            id: id.to_string(),
            name: name.to_string(),
            age,
        })
        .await?;
    }

    // Comparison query through a lazy cursor
    let seniors = repo.filter_by(filter!(age: greater_than(31)));
    println!("over 31: {} people", seniors.count().await?);
    for person in seniors.all().await? {
        println!("  {} ({})", person.name, person.age);
    }

    // Filtered bulk update, then id-based read
    repo.filter_by(filter!(name: "Jack"))
        .update(&values!(age: 31))
        .await?;
    let jack = repo.get(json!("1")).await?;
    println!("Jack is now {}", jack.age);

    // Membership delete
    repo.filter_by(filter!(age: in_(vec![31, 33])?))
        .delete()
        .await?;
    println!("{} people remain", repo.list().await?.len());

    // The same code runs against any configured backend
    let config = StoreConfig::from_yaml_str("backend: memory\nid_field: id\n")?;
    let dynamic: Box<dyn Repository<Person>> = config.build().await?;
    dynamic
        .insert(&Person {
            id: "9".to_string(),
            name: "Jill".to_string(),
            age: 28,
        })
        .await?;
    println!(
        "config-built repository holds {} item(s)",
        dynamic.list().await?.len()
    );

    Ok(())
}
