//! YAML conversation documents.
//!
//! Every field is optional; a missing field takes the built-in default. A
//! document may point at its script with `script_file` instead of inlining
//! it. Relative paths (script file, avatars) resolve against the document's
//! directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::avatar::resolve_relative;
use crate::error_codes::CodedError;
use crate::model::{MessageStatus, Platform, Profile};
use crate::script::{strip_bom, DEFAULT_SCRIPT};
use crate::session::Studio;

pub const DEFAULT_DOCUMENT_NAME: &str = "chat.yaml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<ProfileFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receiver: Option<ProfileFile>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script_file: Option<String>,
}

/// A profile as written in a document. Each field left out keeps the
/// default profile's value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtext: Option<String>,
}

impl ProfileFile {
    pub fn merge_over(self, mut base: Profile) -> Profile {
        if let Some(name) = self.name {
            base.name = name;
        }
        if let Some(avatar) = self.avatar {
            base.avatar = avatar;
        }
        if let Some(subtext) = self.subtext {
            base.subtext = Some(subtext);
        }
        base
    }
}

impl From<Profile> for ProfileFile {
    fn from(profile: Profile) -> Self {
        Self {
            name: Some(profile.name),
            avatar: Some(profile.avatar).filter(|avatar| !avatar.is_empty()),
            subtext: profile.subtext,
        }
    }
}

/// Command-line values that win over the document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub platform: Option<String>,
    pub status: Option<String>,
    /// Inline script; a literal `\n` sequence stands for a line break.
    pub script: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Conversation {
    pub sender: Profile,
    pub receiver: Profile,
    pub platform: Platform,
    pub status: MessageStatus,
    pub script: String,
    /// Document the conversation came from, if any.
    pub source: Option<PathBuf>,
    /// Script file the text was read from, when the document names one.
    pub script_path: Option<PathBuf>,
}

impl Conversation {
    /// A session holding this conversation, with no typing indicator armed.
    pub fn into_studio(self) -> Studio {
        let mut studio = Studio::new();
        self.apply_to(&mut studio);
        studio
    }

    pub fn apply_to(self, studio: &mut Studio) {
        studio.set_sender(self.sender);
        studio.set_receiver(self.receiver);
        studio.set_platform(self.platform);
        studio.set_status(self.status);
        studio.load_script(self.script);
    }
}

pub fn load_file(path: &Path) -> Result<ConversationFile> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read conversation document {}", path.display()))?;
    if text.trim().is_empty() {
        return Ok(ConversationFile::default());
    }
    serde_yaml::from_str(&text).map_err(|error| {
        anyhow!(CodedError::config(
            "INVALID_DOCUMENT",
            format!("failed to parse {}: {error}", path.display()),
        ))
    })
}

fn resolve_profile(profile: Option<ProfileFile>, fallback: Profile, base_dir: &Path) -> Profile {
    let mut profile = match profile {
        Some(fields) => fields.merge_over(fallback),
        None => fallback,
    };
    profile.avatar = resolve_relative(&profile.avatar, base_dir);
    profile
}

pub fn resolve(
    file: ConversationFile,
    base_dir: &Path,
    overrides: &Overrides,
) -> Result<Conversation> {
    let platform = match overrides.platform.as_deref().or(file.platform.as_deref()) {
        Some(keyword) => Platform::from_keyword(keyword)?,
        None => Platform::Tinder,
    };
    let status = match overrides.status.as_deref().or(file.status.as_deref()) {
        Some(keyword) => MessageStatus::from_keyword(keyword)?,
        None => MessageStatus::Read,
    };

    let mut script_path = None;
    let script = if let Some(inline) = &overrides.script {
        inline.replace("\\n", "\n")
    } else {
        match (file.script, file.script_file) {
            (Some(_), Some(_)) => {
                return Err(anyhow!(CodedError::config(
                    "CONFLICTING_SCRIPT",
                    "set either `script` or `script_file`, not both",
                )))
            }
            (Some(script), None) => script,
            (None, Some(script_file)) => {
                let path = base_dir.join(&script_file);
                let text = fs::read_to_string(&path).map_err(|error| {
                    anyhow!(CodedError::config(
                        "SCRIPT_FILE_UNREADABLE",
                        format!("failed to read script file {}: {error}", path.display()),
                    )
                    .with_details(json!({ "script_file": script_file })))
                })?;
                script_path = Some(path);
                strip_bom(&text).to_owned()
            }
            (None, None) => DEFAULT_SCRIPT.to_owned(),
        }
    };

    Ok(Conversation {
        sender: resolve_profile(file.sender, Profile::default_sender(), base_dir),
        receiver: resolve_profile(file.receiver, Profile::default_receiver(), base_dir),
        platform,
        status,
        script,
        source: None,
        script_path,
    })
}

/// Loads `path` (or the defaults when no document is given) and applies
/// the overrides.
pub fn load_conversation(path: Option<&Path>, overrides: &Overrides) -> Result<Conversation> {
    let Some(path) = path else {
        return resolve(ConversationFile::default(), Path::new("."), overrides);
    };
    let file = load_file(path)?;
    let base_dir = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut conversation = resolve(file, base_dir, overrides)?;
    conversation.source = Some(path.to_path_buf());
    Ok(conversation)
}

pub fn starter_file() -> ConversationFile {
    ConversationFile {
        sender: Some(Profile::default_sender().into()),
        receiver: Some(Profile::default_receiver().into()),
        platform: Some(Platform::Tinder.keyword().to_owned()),
        status: Some(MessageStatus::Read.keyword().to_owned()),
        script: Some(format!("{DEFAULT_SCRIPT}\n")),
        script_file: None,
    }
}

pub fn write_starter(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(anyhow!(CodedError::usage(
            "DOCUMENT_EXISTS",
            format!("{} already exists; refusing to overwrite", path.display()),
        )));
    }
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let yaml = serde_yaml::to_string(&starter_file())
        .context("failed to serialize conversation document")?;
    fs::write(path, yaml).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote starter conversation document");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::Path;

    use super::{
        load_conversation, load_file, resolve, write_starter, ConversationFile, Overrides,
    };
    use crate::error_codes::find_coded_error;
    use crate::model::{MessageStatus, Platform};
    use crate::script::{strip_bom, DEFAULT_SCRIPT};

    #[test]
    fn empty_document_takes_every_default() {
        let conversation =
            resolve(ConversationFile::default(), Path::new("."), &Overrides::default())
                .expect("defaults resolve");
        assert_eq!(conversation.platform, Platform::Tinder);
        assert_eq!(conversation.status, MessageStatus::Read);
        assert_eq!(conversation.sender.name, "Alex");
        assert_eq!(conversation.receiver.name, "Jordan");
        assert_eq!(conversation.script, DEFAULT_SCRIPT);
    }

    #[test]
    fn document_fields_and_overrides_combine() {
        let dir = tempfile::tempdir().expect("tempdir");
        let doc = dir.path().join("chat.yaml");
        fs::write(
            &doc,
            "receiver: { name: Kim, avatar: faces/kim.png }\nplatform: WhatsApp\nstatus: sent\nscript: |\n  > hi\n",
        )
        .expect("write doc");

        let conversation = load_conversation(
            Some(&doc),
            &Overrides {
                status: Some("delivered".to_owned()),
                ..Overrides::default()
            },
        )
        .expect("load");
        assert_eq!(conversation.platform, Platform::WhatsApp);
        assert_eq!(conversation.status, MessageStatus::Delivered);
        assert_eq!(conversation.script, "> hi\n");
        assert_eq!(
            Path::new(&conversation.receiver.avatar),
            dir.path().join("faces/kim.png")
        );
        assert_eq!(conversation.receiver.subtext.as_deref(), Some("Online"));
        assert_eq!(conversation.source.as_deref(), Some(doc.as_path()));
        assert_eq!(conversation.script_path, None);
    }

    #[test]
    fn script_file_is_read_relative_to_the_document() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("lines.txt"), "< hey\n").expect("write script");
        let doc = dir.path().join("chat.yaml");
        fs::write(&doc, "script_file: lines.txt\n").expect("write doc");
        let conversation = load_conversation(Some(&doc), &Overrides::default()).expect("load");
        assert_eq!(conversation.script, "< hey\n");
        assert_eq!(
            conversation.script_path.as_deref(),
            Some(dir.path().join("lines.txt").as_path())
        );
    }

    #[test]
    fn script_file_byte_order_mark_is_dropped() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("lines.txt"), "\u{feff}> hi\n< hey\n").expect("write script");
        let doc = dir.path().join("chat.yaml");
        fs::write(&doc, "script_file: lines.txt\n").expect("write doc");
        let conversation = load_conversation(Some(&doc), &Overrides::default()).expect("load");
        assert_eq!(conversation.script, "> hi\n< hey\n");
    }

    #[test]
    fn partial_profiles_keep_the_remaining_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let doc = dir.path().join("chat.yaml");
        fs::write(&doc, "sender: { avatar: me.png }\nreceiver: { subtext: Away }\n")
            .expect("write doc");

        let conversation = load_conversation(Some(&doc), &Overrides::default()).expect("load");
        assert_eq!(conversation.sender.name, "Alex");
        assert_eq!(Path::new(&conversation.sender.avatar), dir.path().join("me.png"));
        assert_eq!(conversation.sender.subtext, None);
        assert_eq!(conversation.receiver.name, "Jordan");
        assert_eq!(conversation.receiver.subtext.as_deref(), Some("Away"));
        assert!(conversation.receiver.avatar.is_empty());
    }

    #[test]
    fn inline_override_unescapes_line_breaks() {
        let conversation = load_conversation(
            None,
            &Overrides {
                script: Some("> a\\n< b".to_owned()),
                ..Overrides::default()
            },
        )
        .expect("load");
        assert_eq!(conversation.script, "> a\n< b");
    }

    #[test]
    fn bad_documents_carry_codes() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cases = [
            ("platform: myspace\n", "INVALID_PLATFORM"),
            ("status: seen\n", "INVALID_STATUS"),
            ("script: '> a'\nscript_file: b.txt\n", "CONFLICTING_SCRIPT"),
            ("script_file: missing.txt\n", "SCRIPT_FILE_UNREADABLE"),
            ("colour: red\n", "INVALID_DOCUMENT"),
        ];
        for (index, (body, code)) in cases.into_iter().enumerate() {
            let doc = dir.path().join(format!("case-{index}.yaml"));
            fs::write(&doc, body).expect("write doc");
            let error = load_conversation(Some(&doc), &Overrides::default())
                .expect_err("document should be rejected");
            let coded = find_coded_error(&error).expect("coded error");
            assert_eq!(coded.code, code, "{body}");
        }
    }

    #[test]
    fn starter_document_round_trips_and_is_never_overwritten() {
        let dir = tempfile::tempdir().expect("tempdir");
        let doc = dir.path().join("nested").join("chat.yaml");
        write_starter(&doc).expect("write starter");
        let file = load_file(&doc).expect("reload");
        assert_eq!(file.platform.as_deref(), Some("tinder"));

        let error = write_starter(&doc).expect_err("second write refused");
        assert_eq!(
            find_coded_error(&error).expect("coded").code,
            "DOCUMENT_EXISTS"
        );
    }
}
