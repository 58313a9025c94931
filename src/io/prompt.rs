/// 确认提示实现

use std::io::{BufRead, Write};

use super::traits::ConfirmPrompt;

/// 总是同意
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeYes;

impl ConfirmPrompt for AssumeYes {
    fn confirm(&self, _question: &str) -> bool {
        true
    }
}

/// 总是拒绝
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeNo;

impl ConfirmPrompt for AssumeNo {
    fn confirm(&self, _question: &str) -> bool {
        false
    }
}

/// 在终端询问，输入 `y` / `yes` 视为同意
#[derive(Debug, Clone, Copy, Default)]
pub struct StdinPrompt;

impl ConfirmPrompt for StdinPrompt {
    fn confirm(&self, question: &str) -> bool {
        print!("{} [y/N] ", question);
        if std::io::stdout().flush().is_err() {
            return false;
        }

        let mut answer = String::new();
        if std::io::stdin().lock().read_line(&mut answer).is_err() {
            return false;
        }
        parse_answer(&answer)
    }
}

fn parse_answer(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
