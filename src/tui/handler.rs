use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::Tab;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppAction {
    Quit,
    MoveUp,
    MoveDown,
    MoveToTop,
    MoveToBottom,
    Open,
    Back,
    GoTo(Tab),
    Refresh,
    ToggleCompleted,
    AddItem,
    EditScore,
    EditDate,
    SignOut,
    ShowHelp,
    HideHelp,
    // Login form actions
    LoginChar(char),
    LoginBackspace,
    LoginNextField,
    LoginSubmit,
    LoginSwitchMode,
    // Text input popup actions
    InputChar(char),
    InputBackspace,
    InputConfirm,
    InputCancel,
}

pub fn handle_key_event(
    key: KeyEvent,
    on_login: bool,
    input_active: bool,
    show_help: bool,
) -> Option<AppAction> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(AppAction::Quit);
    }

    // If help is showing, any key closes it
    if show_help {
        return Some(AppAction::HideHelp);
    }

    if on_login {
        return match (key.code, key.modifiers) {
            (KeyCode::Esc, _) => Some(AppAction::Quit),
            (KeyCode::Enter, _) => Some(AppAction::LoginSubmit),
            (KeyCode::Tab, _) | (KeyCode::BackTab, _) => Some(AppAction::LoginNextField),
            (KeyCode::Char('r'), KeyModifiers::CONTROL) => Some(AppAction::LoginSwitchMode),
            (KeyCode::Backspace, _) => Some(AppAction::LoginBackspace),
            (KeyCode::Char(c), _) => Some(AppAction::LoginChar(c)),
            _ => None,
        };
    }

    if input_active {
        return match key.code {
            KeyCode::Enter => Some(AppAction::InputConfirm),
            KeyCode::Esc => Some(AppAction::InputCancel),
            KeyCode::Backspace => Some(AppAction::InputBackspace),
            KeyCode::Char(c) => Some(AppAction::InputChar(c)),
            _ => None,
        };
    }

    // Normal mode
    match key.code {
        KeyCode::Char('q') => Some(AppAction::Quit),

        KeyCode::Char('j') | KeyCode::Down => Some(AppAction::MoveDown),
        KeyCode::Char('k') | KeyCode::Up => Some(AppAction::MoveUp),
        KeyCode::Char('<') | KeyCode::Home => Some(AppAction::MoveToTop),
        KeyCode::Char('>') | KeyCode::End => Some(AppAction::MoveToBottom),

        KeyCode::Enter => Some(AppAction::Open),
        KeyCode::Esc | KeyCode::Backspace => Some(AppAction::Back),

        KeyCode::Char('1') => Some(AppAction::GoTo(Tab::Subjects)),
        KeyCode::Char('2') => Some(AppAction::GoTo(Tab::Dashboard)),
        KeyCode::Char('3') => Some(AppAction::GoTo(Tab::Schedule)),

        KeyCode::Char('r') => Some(AppAction::Refresh),
        KeyCode::Char(' ') | KeyCode::Char('x') => Some(AppAction::ToggleCompleted),
        KeyCode::Char('a') => Some(AppAction::AddItem),
        KeyCode::Char('e') => Some(AppAction::EditScore),
        KeyCode::Char('t') => Some(AppAction::EditDate),
        KeyCode::Char('L') => Some(AppAction::SignOut),

        KeyCode::Char('?') => Some(AppAction::ShowHelp),

        _ => None,
    }
}
