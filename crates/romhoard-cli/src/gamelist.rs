//! EmulationStation `gamelist.xml` generation.
//!
//! Uses `quick-xml`'s writer API. One `<game>` element per input file,
//! assembled from the resolved record; media tags carry absolute paths into
//! the store's media tree so the gamelist works from any location.

use std::{io::Cursor, path::Path};

use quick_xml::{
  Writer,
  events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
};
use romhoard_core::{fact::ResourceKind, record::GameRecord};
use romhoard_store::media::MediaTree;

/// Resolved kinds emitted as plain text elements, in gamelist tag order.
const TEXT_TAGS: &[(ResourceKind, &str)] = &[
  (ResourceKind::Description, "desc"),
  (ResourceKind::Rating, "rating"),
  (ResourceKind::ReleaseDate, "releasedate"),
  (ResourceKind::Developer, "developer"),
  (ResourceKind::Publisher, "publisher"),
  (ResourceKind::Tags, "genre"),
  (ResourceKind::Players, "players"),
];

/// Resolved kinds emitted as absolute media paths.
const MEDIA_TAGS: &[(ResourceKind, &str)] = &[
  (ResourceKind::Cover, "image"),
  (ResourceKind::Screenshot, "thumbnail"),
  (ResourceKind::Marquee, "marquee"),
  (ResourceKind::Video, "video"),
];

pub struct GamelistBuilder {
  writer: Writer<Cursor<Vec<u8>>>,
}

impl Default for GamelistBuilder {
  fn default() -> Self { Self::new() }
}

impl GamelistBuilder {
  pub fn new() -> Self {
    let cursor = Cursor::new(Vec::new());
    let mut writer = Writer::new_with_indent(cursor, b' ', 2);

    writer
      .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
      .unwrap();
    writer
      .write_event(Event::Start(BytesStart::new("gameList")))
      .unwrap();

    Self { writer }
  }

  /// Append one `<game>` entry for `file_path` from its resolved record.
  pub fn game(
    &mut self,
    file_path: &Path,
    record: &GameRecord,
    media: &MediaTree,
  ) {
    let w = &mut self.writer;

    let file_name = file_path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_else(|| file_path.to_string_lossy().into_owned());
    let stem = file_path
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| file_name.clone());

    write_start(w, "game");
    // EmulationStation resolves paths relative to the gamelist itself.
    write_text_elem(w, "path", &format!("./{file_name}"));
    write_text_elem(w, "name", record.title().unwrap_or(&stem));

    for &(kind, tag) in TEXT_TAGS {
      if let Some(value) = record.value(kind) {
        write_text_elem(w, tag, value);
      }
    }
    for &(kind, tag) in MEDIA_TAGS {
      if let Some(relative) = record.value(kind) {
        let absolute = media.absolute(relative);
        write_text_elem(w, tag, &absolute.to_string_lossy());
      }
    }

    write_end(w, "game");
  }

  pub fn finish(mut self) -> Vec<u8> {
    self
      .writer
      .write_event(Event::End(BytesEnd::new("gameList")))
      .unwrap();
    self.writer.into_inner().into_inner()
  }
}

// ─── XML writer helpers ──────────────────────────────────────────────────────

fn write_start(w: &mut Writer<Cursor<Vec<u8>>>, tag: &str) {
  w.write_event(Event::Start(BytesStart::new(tag))).unwrap();
}

fn write_end(w: &mut Writer<Cursor<Vec<u8>>>, tag: &str) {
  w.write_event(Event::End(BytesEnd::new(tag))).unwrap();
}

fn write_text_elem(w: &mut Writer<Cursor<Vec<u8>>>, tag: &str, text: &str) {
  write_start(w, tag);
  w.write_event(Event::Text(BytesText::new(text))).unwrap();
  write_end(w, tag);
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use romhoard_core::record::Attributed;

  use super::*;

  fn attributed(value: &str) -> Attributed {
    Attributed { value: value.to_string(), source: "test".to_string() }
  }

  #[test]
  fn emits_one_game_entry_per_file() {
    let media = MediaTree::new("/store/media");
    let mut record = GameRecord::new("id-1");
    record
      .values
      .insert(ResourceKind::Title, attributed("Super Metroid"));
    record
      .values
      .insert(ResourceKind::Description, attributed("Explore Zebes."));
    record
      .values
      .insert(ResourceKind::Cover, attributed("cover/import/id-1.png"));

    let mut builder = GamelistBuilder::new();
    builder.game(
      &PathBuf::from("/roms/Super Metroid (USA).sfc"),
      &record,
      &media,
    );
    let xml = String::from_utf8(builder.finish()).unwrap();

    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml.contains("<gameList>"));
    assert!(xml.contains("<path>./Super Metroid (USA).sfc</path>"));
    assert!(xml.contains("<name>Super Metroid</name>"));
    assert!(xml.contains("<desc>Explore Zebes.</desc>"));
    assert!(xml.contains("<image>/store/media/cover/import/id-1.png</image>"));
    assert!(xml.ends_with("</gameList>"));
  }

  #[test]
  fn name_falls_back_to_the_file_stem() {
    let media = MediaTree::new("/store/media");
    let record = GameRecord::new("id-1");

    let mut builder = GamelistBuilder::new();
    builder.game(&PathBuf::from("/roms/Alien 3.sfc"), &record, &media);
    let xml = String::from_utf8(builder.finish()).unwrap();

    assert!(xml.contains("<name>Alien 3</name>"));
  }

  #[test]
  fn reserved_characters_are_escaped() {
    let media = MediaTree::new("/store/media");
    let mut record = GameRecord::new("id-1");
    record
      .values
      .insert(ResourceKind::Description, attributed("Samus <3 & robots"));

    let mut builder = GamelistBuilder::new();
    builder.game(&PathBuf::from("/roms/game.sfc"), &record, &media);
    let xml = String::from_utf8(builder.finish()).unwrap();

    assert!(xml.contains("Samus &lt;3 &amp; robots"));
  }
}
