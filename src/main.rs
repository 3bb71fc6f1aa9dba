use versa::rdf::{Literal, NamedNode, Quad, RdfFormat, RdfPredicate, RdfSerializer, UpdateWriter};
use versa::versioning::{Operation, VersionedStore};
use tracing_subscriber::EnvFilter;

const EX: &str = "http://example.org/people/";
const GRAPHS: &str = "http://example.org/graphs/";
const FOAF: &str = "http://xmlns.com/foaf/0.1/";
const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    println!("Versa versioned quad store v{}", versa::version());
    println!("==========================================");
    println!();

    let store = VersionedStore::in_memory();

    // Demo 1: Commits
    // Each person's type and mailbox live in that person's named graph;
    // names stay in the default graph.
    println!("=== Demo 1: Commits ===");
    let alice_mbox_old = statement("alice", "mbox", Term::Iri("mailto:alice@example.org"))?;
    let alice_mbox_new = statement("alice", "mbox", Term::Iri("mailto:alice@work.example.org"))?;

    store.commit(
        vec![Operation::add([
            person("alice")?,
            statement("alice", "name", Term::Lit("Alice"))?,
            alice_mbox_old.clone(),
        ])],
        Some("Add Alice"),
    )?;
    println!("✓ Added Alice");

    store.commit(
        vec![Operation::add([person("bob")?, statement("bob", "name", Term::Lit("Bob"))?])],
        Some("Add Bob"),
    )?;
    println!("✓ Added Bob");

    let mut tx = store.begin();
    tx.remove([alice_mbox_old]).add([alice_mbox_new]);
    tx.commit("Change Alice's mailbox")?;
    println!("✓ Changed Alice's mailbox");

    store.commit(
        vec![Operation::add([
            person("charlie")?,
            statement("charlie", "name", Term::Lit("Charlie"))?,
        ])],
        None,
    )?;
    println!("✓ Added Charlie (no message)");

    // Demo 2: History and tags
    println!("\n=== Demo 2: History ===");
    for version in store.versions().oldest_first() {
        println!(
            "  {:>3}  {}  {:>2} changes  {}",
            version.id(),
            version.created_at().format("%Y-%m-%d %H:%M:%S"),
            version.changes().added_count() + version.changes().removed_count(),
            version.message().unwrap_or("(no message)")
        );
    }

    let head = store.head_id().ok_or(versa::VersionError::EmptyHistory)?;
    store.create_tag("Release 1.0", head)?;
    println!("\n✓ Tagged version {} as 'Release 1.0'", head);

    // Demo 3: Diff
    println!("\n=== Demo 3: Diff HEAD~2..HEAD ===");
    let from = store.resolve_ref("HEAD~2")?;
    let diff = store.diff(from.id(), head)?;
    print!("{}", UpdateWriter::default().write(&diff));

    // Demo 4: Revert
    println!("\n=== Demo 4: Revert to HEAD~2 ===");
    let reverted = store.revert_to(from.id(), None)?;
    println!(
        "✓ Version {}: {}",
        reverted.id(),
        reverted.message().unwrap_or_default()
    );
    println!("\nStore content:");
    print!(
        "{}",
        RdfSerializer::serialize_snapshot(&store.snapshot(), RdfFormat::TriG)?
    );

    Ok(())
}

enum Term<'a> {
    Iri(&'a str),
    Lit(&'a str),
}

fn person(name: &str) -> anyhow::Result<Quad> {
    Ok(Quad::new(
        NamedNode::new(&format!("{EX}{name}"))?,
        RdfPredicate::new(RDF_TYPE)?,
        NamedNode::new(&format!("{FOAF}Person"))?,
        Some(graph_of(name)?),
    ))
}

fn graph_of(name: &str) -> anyhow::Result<NamedNode> {
    Ok(NamedNode::new(&format!("{GRAPHS}{name}"))?)
}

fn statement(name: &str, property: &str, value: Term<'_>) -> anyhow::Result<Quad> {
    let subject = NamedNode::new(&format!("{EX}{name}"))?;
    let predicate = RdfPredicate::new(&format!("{FOAF}{property}"))?;
    Ok(match value {
        Term::Iri(iri) => Quad::new(
            subject,
            predicate,
            NamedNode::new(iri)?,
            Some(graph_of(name)?),
        ),
        Term::Lit(text) => Quad::triple(subject, predicate, Literal::new_simple_literal(text)),
    })
}
