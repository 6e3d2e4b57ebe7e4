//! Terminal operator: numbered choices on one stream, answers from another.

use std::io::{BufRead, Write};
use std::sync::Mutex;

use migtrack_recovery::Operator;
use migtrack_types::{Issue, RecoveryAction};

const MAX_ATTEMPTS: usize = 3;

pub struct PromptOperator<R, W> {
    input: Mutex<R>,
    output: Mutex<W>,
}

impl<R: BufRead, W: Write> PromptOperator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(input),
            output: Mutex::new(output),
        }
    }

    fn say(&self, text: &str) {
        if let Ok(mut out) = self.output.lock() {
            let _ = write!(out, "{text}");
            let _ = out.flush();
        }
    }

    /// `None` on end of input.
    fn read_answer(&self) -> Option<String> {
        let mut input = self.input.lock().ok()?;
        let mut line = String::new();
        match input.read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

enum Answer {
    Pick(RecoveryAction),
    Skip,
    Invalid,
}

fn parse_answer(answer: &str, choices: &[RecoveryAction]) -> Answer {
    if answer.is_empty() || answer.eq_ignore_ascii_case("s") || answer.eq_ignore_ascii_case("skip") {
        return Answer::Skip;
    }
    if let Ok(n) = answer.parse::<usize>() {
        return match n.checked_sub(1).and_then(|i| choices.get(i)) {
            Some(action) => Answer::Pick(*action),
            None => Answer::Invalid,
        };
    }
    match answer.parse::<RecoveryAction>() {
        Ok(action) if choices.contains(&action) => Answer::Pick(action),
        _ => Answer::Invalid,
    }
}

impl<R, W> Operator for PromptOperator<R, W>
where
    R: BufRead + Send,
    W: Write + Send,
{
    fn choose(&self, issue: &Issue, choices: &[RecoveryAction]) -> Option<RecoveryAction> {
        let mut menu = format!(
            "\n[{}] {} {}\n  {}\n",
            issue.severity.as_str().to_uppercase(),
            issue.kind,
            issue.version,
            issue.description
        );
        for (n, action) in choices.iter().enumerate() {
            menu.push_str(&format!("  {}) {action}\n", n + 1));
        }
        menu.push_str("  s) skip\n");
        self.say(&menu);

        for _ in 0..MAX_ATTEMPTS {
            self.say("Choice: ");
            let answer = self.read_answer()?;
            match parse_answer(&answer, choices) {
                Answer::Pick(action) => return Some(action),
                Answer::Skip => return None,
                Answer::Invalid => self.say(&format!("'{answer}' is not one of the choices\n")),
            }
        }
        None
    }

    fn show(&self, message: &str) {
        self.say(&format!("{message}\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use migtrack_types::IssueKind;
    use std::io::Cursor;

    fn issue() -> Issue {
        Issue::new(IssueKind::OrphanedSchema, "42", Vec::new(), "in schema_migrations only")
    }

    fn ask(input: &str) -> (Option<RecoveryAction>, String) {
        let operator = PromptOperator::new(Cursor::new(input.as_bytes().to_vec()), Vec::new());
        let issue = issue();
        let choice = operator.choose(&issue, &issue.recovery_options);
        let shown = String::from_utf8(operator.output.into_inner().unwrap()).unwrap();
        (choice, shown)
    }

    #[test]
    fn numbered_choice_is_picked() {
        let (choice, shown) = ask("2\n");
        assert_eq!(choice, Some(RecoveryAction::RemoveFromSchema));
        assert!(shown.contains("[MEDIUM] orphaned_schema 42"));
        assert!(shown.contains("1) track_migration"));
        assert!(shown.contains("s) skip"));
    }

    #[test]
    fn action_name_is_accepted() {
        assert_eq!(ask("track_migration\n").0, Some(RecoveryAction::TrackMigration));
    }

    #[test]
    fn skip_and_end_of_input_choose_nothing() {
        assert_eq!(ask("s\n").0, None);
        assert_eq!(ask("\n").0, None);
        assert_eq!(ask("").0, None);
    }

    #[test]
    fn invalid_answers_reprompt_then_give_up() {
        let (choice, shown) = ask("9\nconsolidate_records\nnope\n1\n");
        assert_eq!(choice, None);
        assert_eq!(shown.matches("is not one of the choices").count(), 3);

        assert_eq!(ask("7\n1\n").0, Some(RecoveryAction::TrackMigration));
    }

    #[test]
    fn show_writes_a_line() {
        let operator = PromptOperator::new(Cursor::new(Vec::new()), Vec::new());
        operator.show("UPDATE x;");
        assert_eq!(operator.output.into_inner().unwrap(), b"UPDATE x;\n");
    }
}
