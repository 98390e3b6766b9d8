use crate::config::StageConfig;
use winit::keyboard::{Key, NamedKey};

const EXPRESSION_LETTERS: [&str; 4] = ["q", "w", "e", "r"];
const EXPRESSION_FUNCTION_KEYS: [NamedKey; 4] = [NamedKey::F1, NamedKey::F2, NamedKey::F3, NamedKey::F4];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiCommand {
    SelectState(String),
    SelectExpression(String),
    Quit,
}

/// Keyboard stand-in for the state and expression pickers: digits pick states in configured
/// order, F1..F4 or Q/W/E/R pick expressions, Escape quits.
pub fn command_for_key(key: &Key, stage: &StageConfig) -> Option<UiCommand> {
    match key {
        Key::Named(NamedKey::Escape) => Some(UiCommand::Quit),
        Key::Named(named) => {
            let index = EXPRESSION_FUNCTION_KEYS.iter().position(|candidate| candidate == named)?;
            stage.available_expressions.get(index).cloned().map(UiCommand::SelectExpression)
        }
        Key::Character(text) => {
            let text = text.to_ascii_lowercase();
            if let Some(digit) = text.parse::<usize>().ok().filter(|digit| *digit >= 1) {
                return stage.available_actions.get(digit - 1).cloned().map(UiCommand::SelectState);
            }
            let index = EXPRESSION_LETTERS.iter().position(|letter| *letter == text)?;
            stage.available_expressions.get(index).cloned().map(UiCommand::SelectExpression)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_pick_states_in_configured_order() {
        let stage = StageConfig::default();
        assert_eq!(
            command_for_key(&Key::Character("2".into()), &stage),
            Some(UiCommand::SelectState("Dance".to_string()))
        );
        assert_eq!(command_for_key(&Key::Character("0".into()), &stage), None);
        assert_eq!(command_for_key(&Key::Character("9".into()), &stage), None);
    }

    #[test]
    fn letters_and_function_keys_pick_expressions() {
        let stage = StageConfig::default();
        assert_eq!(
            command_for_key(&Key::Character("W".into()), &stage),
            Some(UiCommand::SelectExpression("Angry".to_string()))
        );
        assert_eq!(
            command_for_key(&Key::Named(NamedKey::F4), &stage),
            Some(UiCommand::SelectExpression("Sad".to_string()))
        );
        assert_eq!(command_for_key(&Key::Named(NamedKey::F9), &stage), None);
        assert_eq!(command_for_key(&Key::Named(NamedKey::Escape), &stage), Some(UiCommand::Quit));
    }
}
