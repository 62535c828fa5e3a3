//! Similar command - notes related to an existing note

use anyhow::Result;

use super::search::print_outcome;
use super::Context;

pub async fn run(ctx: &Context, note_id: &str, limit: Option<usize>, json: bool) -> Result<()> {
    let service = ctx.search_service()?;
    let label = match ctx.store.get_note(note_id)? {
        Some(note) => note.title,
        None => note_id.to_string(),
    };

    let outcome = service.similar_notes(note_id, limit).await;
    print_outcome(&outcome, &label, json)
}
