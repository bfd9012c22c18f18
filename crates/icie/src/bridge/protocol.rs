//! Wire protocol types for client-worker communication.
//!
//! Both directions carry one JSON document per line on the worker's stdio:
//! - **Impulse** (stdin): commands and answers to worker questions
//! - **Reaction** (stdout): display events, questions and operation results
//!
//! Every message is tagged by a `"tag"` field; the remaining fields depend on
//! the variant.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Messages from the client to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum Impulse {
    /// Answer to a [`Reaction::QuickPick`]; `None` when dismissed.
    QuickPickResponse { response: Option<String> },

    /// Answer to a [`Reaction::InputBox`] or one half of a credential
    /// round-trip; `None` when dismissed.
    InputBoxResponse { response: Option<String> },

    TriggerBuild {
        source: PathBuf,
    },

    TriggerTest {
        executable: PathBuf,
        tests: PathBuf,
    },

    TriggerInit {
        url: String,
        root: PathBuf,
    },

    TriggerSubmit {
        source: PathBuf,
        task_url: String,
    },

    TriggerManualSubmit {
        task_url: String,
    },

    TriggerTemplateInstantiate {
        root: PathBuf,
    },

    /// Announces the project root; sent once after the worker starts.
    WorkspaceInfo { root_path: Option<PathBuf> },

    /// Acknowledges a [`Reaction::SaveAll`].
    SavedAll,
}

impl Impulse {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::QuickPickResponse { .. } => "quick_pick_response",
            Self::InputBoxResponse { .. } => "input_box_response",
            Self::TriggerBuild { .. } => "trigger_build",
            Self::TriggerTest { .. } => "trigger_test",
            Self::TriggerInit { .. } => "trigger_init",
            Self::TriggerSubmit { .. } => "trigger_submit",
            Self::TriggerManualSubmit { .. } => "trigger_manual_submit",
            Self::TriggerTemplateInstantiate { .. } => "trigger_template_instantiate",
            Self::WorkspaceInfo { .. } => "workspace_info",
            Self::SavedAll => "saved_all",
        }
    }
}

/// One entry of a [`Reaction::QuickPick`], in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuickPickItem {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Returned to the worker in [`Impulse::QuickPickResponse`].
    pub id: String,
}

/// Messages from the worker to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "tag", rename_all = "snake_case")]
pub enum Reaction {
    /// Status bar text; `None` clears it.
    Status { message: Option<String> },

    InfoMessage { message: String },

    ErrorMessage { message: String },

    QuickPick { items: Vec<QuickPickItem> },

    InputBox {
        #[serde(default)]
        prompt: Option<String>,
        #[serde(default)]
        placeholder: Option<String>,
        #[serde(default)]
        password: bool,
        #[serde(default)]
        ignore_focus_out: bool,
    },

    ConsoleLog { message: String },

    ConsoleError { message: String },

    /// The worker needs every open document flushed to disk.
    SaveAll,

    OpenFolder {
        path: PathBuf,
        #[serde(default)]
        in_new_window: bool,
    },

    /// Position is 1-based.
    OpenEditor { path: PathBuf, row: u32, column: u32 },

    ProgressStart {
        id: String,
        #[serde(default)]
        title: Option<String>,
    },

    ProgressUpdate {
        id: String,
        #[serde(default)]
        increment: Option<f64>,
        #[serde(default)]
        message: Option<String>,
    },

    ProgressEnd { id: String },

    /// Credential challenge for `domain`, raised during init or submit.
    AuthRequest { domain: String },

    /// Terminal result of the operation currently in flight.
    Finished {
        success: bool,
        #[serde(default)]
        message: Option<String>,
    },
}

impl Reaction {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Status { .. } => "status",
            Self::InfoMessage { .. } => "info_message",
            Self::ErrorMessage { .. } => "error_message",
            Self::QuickPick { .. } => "quick_pick",
            Self::InputBox { .. } => "input_box",
            Self::ConsoleLog { .. } => "console_log",
            Self::ConsoleError { .. } => "console_error",
            Self::SaveAll => "save_all",
            Self::OpenFolder { .. } => "open_folder",
            Self::OpenEditor { .. } => "open_editor",
            Self::ProgressStart { .. } => "progress_start",
            Self::ProgressUpdate { .. } => "progress_update",
            Self::ProgressEnd { .. } => "progress_end",
            Self::AuthRequest { .. } => "auth_request",
            Self::Finished { .. } => "finished",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn trigger_build_serializes() {
        let impulse = Impulse::TriggerBuild {
            source: PathBuf::from("/home/u/cool-app/main.cpp"),
        };
        insta::assert_json_snapshot!(impulse, @r#"
        {
          "tag": "trigger_build",
          "source": "/home/u/cool-app/main.cpp"
        }
        "#);
    }

    #[test]
    fn trigger_test_serializes() {
        let impulse = Impulse::TriggerTest {
            executable: PathBuf::from("/p/main.e"),
            tests: PathBuf::from("/p/tests"),
        };
        insta::assert_json_snapshot!(impulse, @r#"
        {
          "tag": "trigger_test",
          "executable": "/p/main.e",
          "tests": "/p/tests"
        }
        "#);
    }

    #[test]
    fn trigger_submit_serializes() {
        let impulse = Impulse::TriggerSubmit {
            source: PathBuf::from("/p/main.cpp"),
            task_url: "https://codeforces.com/contest/1/problem/A".to_string(),
        };
        insta::assert_json_snapshot!(impulse, @r#"
        {
          "tag": "trigger_submit",
          "source": "/p/main.cpp",
          "task_url": "https://codeforces.com/contest/1/problem/A"
        }
        "#);
    }

    #[test]
    fn dismissed_input_box_response_serializes_null() {
        let impulse = Impulse::InputBoxResponse { response: None };
        insta::assert_json_snapshot!(impulse, @r#"
        {
          "tag": "input_box_response",
          "response": null
        }
        "#);
    }

    #[test]
    fn saved_all_serializes() {
        insta::assert_json_snapshot!(Impulse::SavedAll, @r#"
        {
          "tag": "saved_all"
        }
        "#);
    }

    #[test]
    fn impulse_tags_match_wire_tags() {
        let impulses = [
            Impulse::QuickPickResponse { response: None },
            Impulse::InputBoxResponse { response: None },
            Impulse::TriggerBuild { source: PathBuf::new() },
            Impulse::TriggerTest {
                executable: PathBuf::new(),
                tests: PathBuf::new(),
            },
            Impulse::TriggerInit {
                url: String::new(),
                root: PathBuf::new(),
            },
            Impulse::TriggerSubmit {
                source: PathBuf::new(),
                task_url: String::new(),
            },
            Impulse::TriggerManualSubmit { task_url: String::new() },
            Impulse::TriggerTemplateInstantiate { root: PathBuf::new() },
            Impulse::WorkspaceInfo { root_path: None },
            Impulse::SavedAll,
        ];
        for impulse in impulses {
            let value = serde_json::to_value(&impulse).unwrap();
            assert_eq!(value["tag"], impulse.tag());
        }
    }

    #[test]
    fn input_box_defaults_missing_flags() {
        let reaction: Reaction =
            serde_json::from_value(json!({"tag": "input_box", "prompt": "Username"})).unwrap();
        assert_eq!(
            reaction,
            Reaction::InputBox {
                prompt: Some("Username".to_string()),
                placeholder: None,
                password: false,
                ignore_focus_out: false,
            }
        );
    }

    #[test]
    fn quick_pick_keeps_item_order() {
        let reaction: Reaction = serde_json::from_value(json!({
            "tag": "quick_pick",
            "items": [
                {"label": "C++17", "id": "cpp17"},
                {"label": "C++14", "description": "legacy", "id": "cpp14"},
            ]
        }))
        .unwrap();
        let Reaction::QuickPick { items } = reaction else {
            panic!("wrong variant");
        };
        let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["cpp17", "cpp14"]);
        assert_eq!(items[1].description.as_deref(), Some("legacy"));
    }

    #[test]
    fn progress_triple_parses() {
        let start: Reaction =
            serde_json::from_value(json!({"tag": "progress_start", "id": "7", "title": "Testing"}))
                .unwrap();
        let update: Reaction = serde_json::from_value(
            json!({"tag": "progress_update", "id": "7", "increment": 50.0}),
        )
        .unwrap();
        let end: Reaction =
            serde_json::from_value(json!({"tag": "progress_end", "id": "7"})).unwrap();
        assert_eq!(start.tag(), "progress_start");
        assert!(matches!(update, Reaction::ProgressUpdate { increment: Some(i), message: None, .. } if i == 50.0));
        assert_eq!(end, Reaction::ProgressEnd { id: "7".to_string() });
    }

    #[test]
    fn unknown_tag_is_rejected() {
        let result = serde_json::from_value::<Reaction>(json!({"tag": "launch_missiles"}));
        assert!(result.is_err());
    }

    #[test]
    fn finished_message_is_optional() {
        let reaction: Reaction =
            serde_json::from_value(json!({"tag": "finished", "success": true})).unwrap();
        assert_eq!(
            reaction,
            Reaction::Finished {
                success: true,
                message: None
            }
        );
    }
}
