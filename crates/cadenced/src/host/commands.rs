//! Built-in command handlers backed by the [`Session`].
//!
//! Handlers are thin glue: they pull parameters out of the request and call
//! the matching session method. Which of them run on the host thread is
//! decided by the route manifest, not here.

use std::sync::Arc;

use cadence_protocol::Params;
use serde_json::Value;

use crate::routes::{CommandError, HandlerCatalog, RouteError, handler};

use super::params::{float, integer, notes, text};
use super::session::Session;

/// Names of the handlers installed by [`register_builtin_commands`].
pub const BUILTIN_COMMANDS: &[&str] = &[
    "get_session_info",
    "get_track_info",
    "get_playback_position",
    "create_midi_track",
    "set_track_name",
    "create_clip",
    "add_notes_to_clip",
    "set_clip_name",
    "set_tempo",
    "fire_clip",
    "stop_clip",
    "start_playback",
    "stop_playback",
    "set_playback_position",
];

type SessionCommand = fn(&Session, &Params) -> Result<Value, CommandError>;

/// Registers every built-in handler against `session`.
///
/// # Errors
///
/// Returns [`RouteError::DuplicateHandler`] if the catalog already holds one
/// of the built-in names.
pub fn register_builtin_commands(
    catalog: &mut HandlerCatalog,
    session: &Arc<Session>,
) -> Result<(), RouteError> {
    let commands: [(&str, SessionCommand); 14] = [
        ("get_session_info", |session, _| session.info()),
        ("get_track_info", |session, params| {
            session.track_info(integer(params, "track_index", Some(0))?)
        }),
        ("get_playback_position", |session, _| {
            session.playback_position()
        }),
        ("create_midi_track", |session, params| {
            session.create_midi_track(integer(params, "index", Some(-1))?)
        }),
        ("set_track_name", |session, params| {
            session.set_track_name(
                integer(params, "track_index", Some(0))?,
                text(params, "name")?,
            )
        }),
        ("create_clip", |session, params| {
            session.create_clip(
                integer(params, "track_index", Some(0))?,
                integer(params, "clip_index", Some(0))?,
                float(params, "length", Some(4.0))?,
            )
        }),
        ("add_notes_to_clip", |session, params| {
            session.add_notes(
                integer(params, "track_index", Some(0))?,
                integer(params, "clip_index", Some(0))?,
                notes(params, "notes")?,
            )
        }),
        ("set_clip_name", |session, params| {
            session.set_clip_name(
                integer(params, "track_index", Some(0))?,
                integer(params, "clip_index", Some(0))?,
                text(params, "name")?,
            )
        }),
        ("set_tempo", |session, params| {
            session.set_tempo(float(params, "tempo", Some(120.0))?)
        }),
        ("fire_clip", |session, params| {
            session.fire_clip(
                integer(params, "track_index", Some(0))?,
                integer(params, "clip_index", Some(0))?,
            )
        }),
        ("stop_clip", |session, params| {
            session.stop_clip(
                integer(params, "track_index", Some(0))?,
                integer(params, "clip_index", Some(0))?,
            )
        }),
        ("start_playback", |session, _| session.start_playback()),
        ("stop_playback", |session, _| session.stop_playback()),
        ("set_playback_position", |session, params| {
            session.set_playback_position(float(params, "time", Some(0.0))?)
        }),
    ];

    for (name, command) in commands {
        let session = Arc::clone(session);
        catalog.register(name, handler(move |params| command(&session, params)))?;
    }
    Ok(())
}
