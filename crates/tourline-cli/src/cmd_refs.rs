use crate::to_json;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use tourline::v1::RefKind;
use tourline_git::{GitRepository, RefChoice, RefInfo, list_refs, ref_choices};

#[derive(Serialize)]
struct ChoiceOut<'a> {
    label: &'a str,
    description: &'a str,
    #[serde(rename = "ref")]
    git_ref: &'a str,
}

#[derive(Serialize)]
struct RefOut<'a> {
    name: &'a str,
    kind: &'static str,
    head: &'a str,
    subject: &'a str,
    timestamp: &'a str,
}

fn kind_name(kind: RefKind) -> &'static str {
    match kind {
        RefKind::Branch => "branch",
        RefKind::Tag => "tag",
    }
}

pub fn run(roots: &[PathBuf], json: bool, pretty: bool) -> Result<()> {
    let root = roots.first().context("No workspace root given")?;
    let repo = match GitRepository::discover(root) {
        Ok(repo) => repo,
        Err(e) => {
            tracing::debug!(error = %e, "no repository");
            eprintln!(
                "{} is not in a git repository; tours there can't be pinned to a ref",
                root.display()
            );
            return Ok(());
        }
    };

    let choices = ref_choices(&repo)?;
    let refs = list_refs(&repo)?;

    if json {
        let value = serde_json::json!({
            "choices": choices.iter().map(choice_out).collect::<Vec<_>>(),
            "refs": refs.iter().map(ref_out).collect::<Vec<_>>(),
        });
        println!("{}", to_json(&value, pretty)?);
    } else {
        print!("{}", render(&choices, &refs));
    }
    Ok(())
}

fn choice_out(choice: &RefChoice) -> ChoiceOut<'_> {
    ChoiceOut {
        label: &choice.label,
        description: &choice.description,
        git_ref: &choice.git_ref,
    }
}

fn ref_out(info: &RefInfo) -> RefOut<'_> {
    RefOut {
        name: &info.name,
        kind: kind_name(info.kind),
        head: &info.head,
        subject: &info.subject,
        timestamp: &info.timestamp,
    }
}

fn render(choices: &[RefChoice], refs: &[RefInfo]) -> String {
    let mut out = String::from("Pin a new tour to:\n");
    for choice in choices {
        out.push_str(&format!("  {:<40} --ref {}\n", choice.label, choice.git_ref));
    }
    if !refs.is_empty() {
        out.push_str("\nRefs:\n");
        for info in refs {
            out.push_str(&format!(
                "  {:<6} {:<24} {} {}  {}\n",
                kind_name(info.kind),
                info.name,
                info.head_short,
                info.timestamp,
                info.subject
            ));
        }
    }
    out
}
