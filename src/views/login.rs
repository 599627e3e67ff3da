use crate::error::{AppError, AuthError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    #[default]
    SignIn,
    SignUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Email,
    Password,
}

/// State of the login and registration forms.
#[derive(Debug, Default)]
pub struct LoginForm {
    pub mode: AuthMode,
    pub focus: LoginField,
    pub email: String,
    pub password: String,
    pub loading: bool,
    pub error: Option<String>,
    pub notice: Option<String>,
}

impl LoginForm {
    pub fn new(mode: AuthMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            LoginField::Email => LoginField::Password,
            LoginField::Password => LoginField::Email,
        };
    }

    pub fn push_char(&mut self, c: char) {
        match self.focus {
            LoginField::Email => self.email.push(c),
            LoginField::Password => self.password.push(c),
        }
    }

    pub fn pop_char(&mut self) {
        match self.focus {
            LoginField::Email => self.email.pop(),
            LoginField::Password => self.password.pop(),
        };
    }

    pub fn is_complete(&self) -> bool {
        !self.email.trim().is_empty() && !self.password.is_empty()
    }

    pub fn sign_in_failed(&mut self, err: &AppError) {
        tracing::error!("Sign in failed: {}", err);
        self.error = Some(sign_in_message(err).to_string());
    }

    pub fn sign_up_failed(&mut self, err: &AppError) {
        tracing::error!("Sign up failed: {}", err);
        self.error = Some(match err {
            AppError::Auth(AuthError::Other(message)) if !message.is_empty() => message.clone(),
            _ => "Falha ao criar conta".to_string(),
        });
    }
}

pub fn sign_in_message(err: &AppError) -> &'static str {
    match err {
        AppError::Auth(AuthError::InvalidCredentials) => {
            "Este email não está registrado. Deseja criar uma conta?"
        }
        AppError::Auth(AuthError::EmailNotConfirmed) => {
            "Por favor, confirme seu email antes de fazer login. Verifique sua caixa de entrada (incluindo spam) para o link de confirmação."
        }
        _ => "Falha ao fazer login",
    }
}
