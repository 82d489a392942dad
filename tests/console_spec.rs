use std::io::Cursor;

use chrono::DateTime;
use hbnb::console::{Console, PROMPT};
use hbnb::models::KindRegistry;
use hbnb::storage::FileStore;
use speculate2::speculate;
use tempfile::TempDir;
use uuid::Uuid;

/// Run one scripted session against the store in `dir`, returning the raw
/// output (prompts included). Each call is a fresh process-like session
/// over the same persisted document.
fn run_session(dir: &TempDir, script: &str) -> String {
    let registry = KindRegistry::builtin();
    let store =
        FileStore::open(dir.path().join("file.json"), &registry).expect("open store");
    let mut console = Console::new(registry, store);
    let mut out = Vec::new();
    console
        .run(Cursor::new(script.as_bytes()), &mut out)
        .expect("session I/O");
    String::from_utf8(out).expect("utf-8 output")
}

/// Per-command output blocks with the prompts stripped.
fn responses(output: &str) -> Vec<String> {
    output
        .split(PROMPT)
        .map(|block| block.trim_end_matches('\n').to_string())
        .filter(|block| !block.is_empty())
        .collect()
}

/// Create one instance and return its printed id.
fn created_id(dir: &TempDir, kind: &str) -> String {
    let output = run_session(dir, &format!("create {kind}\n"));
    let id = responses(&output)[0].clone();
    Uuid::parse_str(&id).expect("create prints a uuid");
    id
}

/// The attribute mapping from a `show` response, `[Kind] (id) {mapping}`.
fn described_json(response: &str) -> serde_json::Value {
    let payload = response.splitn(3, ' ').nth(2).expect("describe payload");
    serde_json::from_str(payload).expect("describe mapping is json")
}

speculate! {
    before {
        let dir = TempDir::new().expect("temp dir");
    }

    describe "create" {
        it "prints the new id and persists immediately" {
            let id = created_id(&dir, "User");
            assert!(dir.path().join("file.json").exists());

            let output = run_session(&dir, &format!("show User {id}\n"));
            assert!(responses(&output)[0].contains(&id));
        }

        it "reports a missing class name" {
            let output = run_session(&dir, "create\n");
            assert_eq!(responses(&output), vec!["** class name missing **"]);
        }

        it "reports an unknown class" {
            let output = run_session(&dir, "create Spaceship\n");
            assert_eq!(responses(&output), vec!["** class doesn't exist **"]);
        }
    }

    describe "show" {
        it "prints kind, id, and both timestamp fields" {
            let id = created_id(&dir, "User");
            let output = run_session(&dir, &format!("show User {id}\n"));
            let shown = &responses(&output)[0];

            assert!(shown.starts_with(&format!("[User] ({id})")));
            assert!(shown.contains("created_at"));
            assert!(shown.contains("updated_at"));
        }

        it "reports a missing instance id" {
            let output = run_session(&dir, "show User\n");
            assert_eq!(responses(&output), vec!["** instance id missing **"]);
        }

        it "reports an unknown instance" {
            let output = run_session(&dir, "show User 1234-5678\n");
            assert_eq!(responses(&output), vec!["** no instance found **"]);
        }
    }

    describe "update" {
        it "sets the attribute and advances updated_at" {
            let id = created_id(&dir, "User");
            std::thread::sleep(std::time::Duration::from_millis(2));
            let output = run_session(
                &dir,
                &format!("update User {id} first_name \"Betty\"\nshow User {id}\n"),
            );
            let doc = described_json(&responses(&output)[0]);

            assert_eq!(doc["first_name"], serde_json::json!("Betty"));
            let created =
                DateTime::parse_from_rfc3339(doc["created_at"].as_str().expect("created_at"))
                    .expect("timestamp");
            let updated =
                DateTime::parse_from_rfc3339(doc["updated_at"].as_str().expect("updated_at"))
                    .expect("timestamp");
            assert!(updated > created);
        }

        it "treats a quoted value with spaces as one value" {
            let id = created_id(&dir, "User");
            let output = run_session(
                &dir,
                &format!("update User {id} first_name \"Betty Holberton\"\nshow User {id}\n"),
            );
            let doc = described_json(&responses(&output)[0]);
            assert_eq!(doc["first_name"], serde_json::json!("Betty Holberton"));
        }

        it "coerces numeric-looking values to numbers" {
            let id = created_id(&dir, "Place");
            let output = run_session(
                &dir,
                &format!("update Place {id} number_rooms 4\nupdate Place {id} age 89\nshow Place {id}\n"),
            );
            let doc = described_json(&responses(&output)[0]);
            assert_eq!(doc["number_rooms"], serde_json::json!(4));
            assert_eq!(doc["age"], serde_json::json!(89));
        }

        it "rejects a non-numeric value for a declared numeric attribute" {
            let id = created_id(&dir, "Place");
            let output = run_session(
                &dir,
                &format!("update Place {id} number_rooms many\nshow Place {id}\n"),
            );
            let blocks = responses(&output);

            assert!(blocks[0].contains("expects an integer"));
            let doc = described_json(&blocks[1]);
            assert_eq!(doc["number_rooms"], serde_json::json!(0));
        }

        it "never overwrites protected fields" {
            let id = created_id(&dir, "User");
            let output = run_session(
                &dir,
                &format!("update User {id} id hijacked\nshow User {id}\n"),
            );
            let doc = described_json(&responses(&output)[0]);
            assert_eq!(doc["id"], serde_json::json!(id));
        }

        it "reports missing arguments in order" {
            let id = created_id(&dir, "User");
            let script = format!(
                "update\nupdate User\nupdate User 1234\nupdate User {id}\nupdate User {id} first_name\n"
            );
            let output = run_session(&dir, &script);
            assert_eq!(
                responses(&output),
                vec![
                    "** class name missing **",
                    "** instance id missing **",
                    "** no instance found **",
                    "** attribute name missing **",
                    "** value missing **",
                ]
            );
        }
    }

    describe "destroy" {
        it "removes the instance durably" {
            let id = created_id(&dir, "User");
            run_session(&dir, &format!("destroy User {id}\n"));

            let output = run_session(&dir, &format!("show User {id}\n"));
            assert_eq!(responses(&output), vec!["** no instance found **"]);
        }

        it "reports a nonexistent instance and leaves the count unchanged" {
            created_id(&dir, "User");
            let output = run_session(&dir, "destroy User no-such-id\ncount User\n");
            assert_eq!(
                responses(&output),
                vec!["** no instance found **", "1"]
            );
        }
    }

    describe "all" {
        it "lists every instance of one kind" {
            let output = run_session(
                &dir,
                "create User\ncreate User\ncreate State\nall User\n",
            );
            let blocks = responses(&output);
            let listing: Vec<&str> = blocks[3].lines().collect();

            assert_eq!(listing.len(), 2);
            assert!(listing.iter().all(|line| line.starts_with("[User]")));
        }

        it "lists every kind grouped in registration order" {
            let output = run_session(&dir, "create State\ncreate User\nall\n");
            let blocks = responses(&output);
            let listing: Vec<&str> = blocks[2].lines().collect();

            assert_eq!(listing.len(), 2);
            assert!(listing[0].starts_with("[User]"));
            assert!(listing[1].starts_with("[State]"));
        }

        it "prints nothing for a known kind with no instances" {
            let output = run_session(&dir, "all User\n");
            assert!(responses(&output).is_empty());
        }

        it "rejects an unknown kind" {
            let output = run_session(&dir, "all Spaceship\n");
            assert_eq!(responses(&output), vec!["** class doesn't exist **"]);
        }
    }

    describe "count" {
        it "counts instances of one kind" {
            let output = run_session(
                &dir,
                "create User\ncreate User\ncount User\ncount State\n",
            );
            let blocks = responses(&output);
            assert_eq!(blocks[2], "2");
            assert_eq!(blocks[3], "0");
        }

        it "requires a class name" {
            let output = run_session(&dir, "count\n");
            assert_eq!(responses(&output), vec!["** class name missing **"]);
        }
    }

    describe "dotted-call syntax" {
        it "matches the space-separated form byte for byte" {
            let id = created_id(&dir, "User");

            let spaced = run_session(&dir, &format!("show User {id}\ncount User\nall User\n"));
            let dotted = run_session(
                &dir,
                &format!("User.show(\"{id}\")\nUser.count()\nUser.all()\n"),
            );
            assert_eq!(spaced, dotted);
        }

        it "creates and destroys like the canonical form" {
            let output = run_session(&dir, "User.create()\n");
            let id = responses(&output)[0].clone();
            Uuid::parse_str(&id).expect("dotted create prints a uuid");

            let output = run_session(
                &dir,
                &format!("User.destroy(\"{id}\")\nshow User {id}\n"),
            );
            assert_eq!(responses(&output), vec!["** no instance found **"]);
        }

        it "applies inline mapping pairs in order" {
            let id = created_id(&dir, "User");
            let output = run_session(
                &dir,
                &format!(
                    "User.update(\"{id}\", {{'first_name': \"John\", 'age': 89}})\nshow User {id}\n"
                ),
            );
            let doc = described_json(&responses(&output)[0]);

            assert_eq!(doc["first_name"], serde_json::json!("John"));
            assert_eq!(doc["age"], serde_json::json!(89));
        }
    }

    describe "session control" {
        it "ignores empty lines" {
            let output = run_session(&dir, "\n\nquit\n");
            assert_eq!(output, PROMPT.repeat(3));
        }

        it "reports unknown syntax without side effects" {
            let output = run_session(&dir, "frobnicate\ncount User\n");
            assert_eq!(
                responses(&output),
                vec!["*** Unknown syntax: frobnicate", "0"]
            );
        }

        it "quits on the eof sentinel without reading further" {
            let output = run_session(&dir, "EOF\ncreate User\n");
            assert_eq!(output, PROMPT);
        }

        it "terminates cleanly at end of input" {
            let output = run_session(&dir, "");
            assert_eq!(output, PROMPT);
        }

        it "lists commands and known kinds under help" {
            let output = run_session(&dir, "help\n");
            let block = responses(&output).join("\n");
            assert!(block.contains("Documented commands"));
            assert!(block.contains("create"));
            assert!(block.contains("User"));
        }
    }

    describe "end-to-end scenario" {
        it "creates, shows, updates, destroys, and counts" {
            let id = created_id(&dir, "User");

            let script = format!(
                "show User {id}\nupdate User {id} first_name \"Betty\"\nshow User {id}\ndestroy User {id}\nshow User {id}\n"
            );
            let output = run_session(&dir, &script);
            let blocks = responses(&output);

            assert!(blocks[0].contains(&id));
            assert!(blocks[0].contains("created_at"));
            assert!(blocks[1].contains("Betty"));
            assert_ne!(blocks[0], blocks[1]);
            assert_eq!(blocks[2], "** no instance found **");

            let output = run_session(&dir, "create User\ncreate User\ncount User\n");
            assert_eq!(responses(&output)[2], "2");
        }
    }
}
