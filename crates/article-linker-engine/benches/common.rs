// Benchmark helper functions - Rust's dead code analysis doesn't understand
// that these are used by benchmark files in the same directory
// See: https://users.rust-lang.org/t/cargo-rustc-benches-awarnings/110111/2
use article_linker_engine::links::LinkStateStore;
use article_linker_engine::{Anchor, Container, Document, GroupId, Link, LinkState, ResourceId};

fn row_markup(i: usize) -> String {
    format!("Row {i} has <em>some emphasis</em> and a <b>bold <i>nested</i> run</b> of text.")
}

#[allow(dead_code)]
pub fn generate_document(containers: usize) -> Document {
    Document::new((0..containers).map(|i| Container::new(format!("ac{i}"), row_markup(i))))
}

/// Two links per container: one over "Row N", one over the "of" near the end.
#[allow(dead_code)]
pub fn generate_link_state(containers: usize) -> LinkState {
    let mut store = LinkStateStore::new();
    for i in 0..containers {
        let id = format!("ac{i}");
        let head = format!("Row {i}").len();
        let tail = row_markup(i).find("of text").unwrap_or(0);
        store.register(Link {
            resource: ResourceId::new("r1"),
            group: GroupId::new(format!("head-{i}")),
            anchors: vec![Anchor::new(id.clone(), 0, head)],
        });
        store.register(Link {
            resource: ResourceId::new("r1"),
            group: GroupId::new(format!("tail-{i}")),
            anchors: vec![Anchor::new(id, tail, tail + 2)],
        });
    }
    store.state().clone()
}
