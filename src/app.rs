use std::path::PathBuf;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::models::{parse_date, parse_score, Evaluation, EvaluationPatch};
use crate::services::{AuthClient, RestClient};
use crate::session::SessionProvider;
use crate::tui::AppAction;
use crate::views::{AuthMode, DashboardRow, DashboardView, LoginForm, SubjectsView, TopicsView};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    Login,
    Register,
    Subjects,
    Topics(String),
    Dashboard,
    Schedule,
}

impl Route {
    pub fn requires_auth(&self) -> bool {
        !matches!(self, Route::Login | Route::Register)
    }

    pub fn tab(&self) -> Option<Tab> {
        match self {
            Route::Subjects | Route::Topics(_) => Some(Tab::Subjects),
            Route::Dashboard => Some(Tab::Dashboard),
            Route::Schedule => Some(Tab::Schedule),
            Route::Login | Route::Register => None,
        }
    }
}

/// Top-level navigation entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Subjects,
    Dashboard,
    Schedule,
}

impl Tab {
    pub const ALL: [Tab; 3] = [Tab::Subjects, Tab::Dashboard, Tab::Schedule];

    pub fn label(&self) -> &'static str {
        match self {
            Tab::Subjects => "Disciplinas",
            Tab::Dashboard => "Painel",
            Tab::Schedule => "Agenda",
        }
    }

    fn route(self) -> Route {
        match self {
            Tab::Subjects => Route::Subjects,
            Tab::Dashboard => Route::Dashboard,
            Tab::Schedule => Route::Schedule,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputTarget {
    NewSubject,
    NewTopic,
    NewEvaluation {
        subject_id: String,
    },
    Score {
        subject_id: String,
        evaluation_id: String,
    },
    Date {
        subject_id: String,
        evaluation_id: String,
    },
}

impl InputTarget {
    pub fn prompt(&self) -> &'static str {
        match self {
            InputTarget::NewSubject => " Nova disciplina ",
            InputTarget::NewTopic => " Novo assunto ",
            InputTarget::NewEvaluation { .. } => " Nova avaliação (AAAA-MM-DD nota) ",
            InputTarget::Score { .. } => " Nota (0 a 10) ",
            InputTarget::Date { .. } => " Data (AAAA-MM-DD) ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextInput {
    pub target: InputTarget,
    pub buffer: String,
}

/// Build the auth-backed session and the query client from configuration,
/// restoring any cached session.
pub async fn connect(config: &Config) -> Result<(SessionProvider, RestClient)> {
    let timeout = Duration::from_secs(config.request_timeout_secs);
    let auth = AuthClient::new(&config.supabase_url, &config.supabase_anon_key, timeout)?;
    let mut rest = RestClient::new(&config.supabase_url, &config.supabase_anon_key, timeout)?;

    let mut session = SessionProvider::new(auth, Some(PathBuf::from(&config.session_path)));
    session.restore().await?;
    rest.set_access_token(session.access_token().map(str::to_string));

    Ok((session, rest))
}

pub struct App {
    // Routing
    pub route: Route,

    // View state
    pub login: LoginForm,
    pub subjects: SubjectsView,
    pub topics: Option<TopicsView>,
    pub dashboard: DashboardView,

    // UI State
    pub selected_index: usize,
    pub input: Option<TextInput>,
    pub show_help: bool,

    // Services
    session: SessionProvider,
    rest: RestClient,
    subject_limit: usize,
}

impl App {
    pub async fn new(config: &Config) -> Result<Self> {
        let (session, rest) = connect(config).await?;
        let mut app = Self::with_services(session, rest, config.subject_limit);
        app.navigate(Route::Subjects).await;
        Ok(app)
    }

    pub fn with_services(session: SessionProvider, mut rest: RestClient, subject_limit: usize) -> Self {
        rest.set_access_token(session.access_token().map(str::to_string));
        Self {
            route: Route::Login,
            login: LoginForm::new(AuthMode::SignIn),
            subjects: SubjectsView::new(subject_limit),
            topics: None,
            dashboard: DashboardView::new(),
            selected_index: 0,
            input: None,
            show_help: false,
            session,
            rest,
            subject_limit,
        }
    }

    pub fn user_email(&self) -> Option<&str> {
        self.session.current_user().and_then(|u| u.email.as_deref())
    }

    fn user_id(&self) -> Option<String> {
        self.session.current_user().map(|u| u.id.clone())
    }

    pub fn on_login(&self) -> bool {
        !self.route.requires_auth()
    }

    pub fn input_active(&self) -> bool {
        self.input.is_some()
    }

    /// Switch route and load its data. Protected routes fall back to login
    /// while there is no session.
    pub async fn navigate(&mut self, route: Route) {
        let route = if route.requires_auth() && !self.session.is_authenticated() {
            Route::Login
        } else {
            route
        };

        self.selected_index = 0;
        self.input = None;

        match &route {
            Route::Login => self.login.mode = AuthMode::SignIn,
            Route::Register => self.login.mode = AuthMode::SignUp,
            Route::Subjects => {
                self.subjects = SubjectsView::new(self.subject_limit);
                if let Some(user_id) = self.user_id() {
                    self.subjects.fetch_subjects(&self.rest, &user_id).await;
                }
            }
            Route::Topics(subject_id) => {
                let mut view = TopicsView::new(subject_id);
                view.fetch_topics_for_subject(&self.rest, subject_id).await;
                self.topics = Some(view);
            }
            Route::Dashboard => {
                self.dashboard = DashboardView::new();
                self.dashboard.fetch_all(&self.rest).await;
            }
            Route::Schedule => {}
        }

        tracing::debug!("Navigated to {:?}", route);
        self.route = route;
    }

    fn list_len(&self) -> usize {
        match self.route {
            Route::Subjects => self.subjects.subjects.len(),
            Route::Topics(_) => self.topics.as_ref().map_or(0, |v| v.topics.len()),
            Route::Dashboard => self.dashboard.rows().len(),
            _ => 0,
        }
    }

    pub fn selected_dashboard_row(&self) -> Option<DashboardRow> {
        self.dashboard.rows().get(self.selected_index).copied()
    }

    fn evaluation_at(&self, s: usize, e: usize) -> Option<(&str, &Evaluation)> {
        let subject = &self.dashboard.subjects.get(s)?.subject;
        Some((subject.id.as_str(), subject.evaluations.get(e)?))
    }

    pub async fn handle_action(&mut self, action: AppAction) -> Result<bool> {
        if action != AppAction::Quit && !self.on_login() && !self.keep_session_fresh().await {
            return Ok(false);
        }

        match action {
            AppAction::Quit => return Ok(true),

            AppAction::MoveUp => {
                if self.selected_index > 0 {
                    self.selected_index -= 1;
                }
            }

            AppAction::MoveDown => {
                let len = self.list_len();
                if len > 0 && self.selected_index < len - 1 {
                    self.selected_index += 1;
                }
            }

            AppAction::MoveToTop => self.selected_index = 0,

            AppAction::MoveToBottom => {
                self.selected_index = self.list_len().saturating_sub(1);
            }

            AppAction::Open => self.open_selected().await,

            AppAction::Back => {
                if matches!(self.route, Route::Topics(_)) {
                    self.navigate(Route::Subjects).await;
                }
            }

            AppAction::GoTo(tab) => self.navigate(tab.route()).await,

            AppAction::Refresh => {
                let index = self.selected_index;
                self.navigate(self.route.clone()).await;
                self.selected_index = index.min(self.list_len().saturating_sub(1));
            }

            AppAction::ToggleCompleted => self.toggle_selected().await,

            AppAction::AddItem => self.start_add(),

            AppAction::EditScore | AppAction::EditDate => {
                let editing_score = action == AppAction::EditScore;
                self.start_edit_evaluation(editing_score);
            }

            AppAction::SignOut => self.sign_out().await,

            AppAction::ShowHelp => self.show_help = true,

            AppAction::HideHelp => self.show_help = false,

            AppAction::LoginChar(c) => self.login.push_char(c),

            AppAction::LoginBackspace => self.login.pop_char(),

            AppAction::LoginNextField => self.login.toggle_focus(),

            AppAction::LoginSwitchMode => {
                let next = match self.route {
                    Route::Register => Route::Login,
                    _ => Route::Register,
                };
                self.login.error = None;
                self.login.notice = None;
                self.navigate(next).await;
            }

            AppAction::LoginSubmit => self.submit_login().await,

            AppAction::InputChar(c) => {
                if let Some(input) = self.input.as_mut() {
                    input.buffer.push(c);
                }
            }

            AppAction::InputBackspace => {
                if let Some(input) = self.input.as_mut() {
                    input.buffer.pop();
                }
            }

            AppAction::InputConfirm => self.confirm_input().await,

            AppAction::InputCancel => self.input = None,
        }

        Ok(false)
    }

    async fn open_selected(&mut self) {
        let subject_id = match self.route {
            Route::Subjects => self
                .subjects
                .subjects
                .get(self.selected_index)
                .map(|s| s.id.clone()),
            Route::Dashboard => match self.selected_dashboard_row() {
                Some(DashboardRow::Subject(s)) => {
                    self.dashboard.subjects.get(s).map(|s| s.subject.id.clone())
                }
                _ => None,
            },
            _ => None,
        };

        if let Some(id) = subject_id {
            self.navigate(Route::Topics(id)).await;
        }
    }

    async fn toggle_selected(&mut self) {
        match self.route {
            Route::Topics(_) => {
                if let Some(view) = self.topics.as_mut() {
                    if let Some(topic_id) = view.topics.get(self.selected_index).map(|t| t.id.clone()) {
                        view.toggle_topic_completion(&self.rest, &topic_id).await;
                    }
                }
            }
            Route::Dashboard => match self.selected_dashboard_row() {
                Some(DashboardRow::Topic(s, t)) => {
                    let topic_id = self
                        .dashboard
                        .subjects
                        .get(s)
                        .and_then(|s| s.topics.get(t))
                        .map(|t| t.id.clone());
                    if let Some(topic_id) = topic_id {
                        self.dashboard.toggle_topic(&self.rest, &topic_id).await;
                    }
                }
                Some(DashboardRow::Evaluation(s, e)) => {
                    let target = self
                        .evaluation_at(s, e)
                        .map(|(sid, ev)| (sid.to_string(), ev.id.clone(), ev.completed));
                    if let Some((subject_id, evaluation_id, completed)) = target {
                        let patch = EvaluationPatch {
                            completed: Some(!completed),
                            ..Default::default()
                        };
                        self.dashboard
                            .update_evaluation(&self.rest, &subject_id, &evaluation_id, patch)
                            .await;
                    }
                }
                _ => {}
            },
            _ => {}
        }
    }

    fn start_add(&mut self) {
        let target = match self.route {
            Route::Subjects => Some(InputTarget::NewSubject),
            Route::Topics(_) => Some(InputTarget::NewTopic),
            Route::Dashboard => self.selected_dashboard_row().and_then(|row| {
                self.dashboard
                    .subjects
                    .get(row.subject_index())
                    .map(|s| InputTarget::NewEvaluation {
                        subject_id: s.subject.id.clone(),
                    })
            }),
            _ => None,
        };

        if let Some(target) = target {
            self.input = Some(TextInput {
                target,
                buffer: String::new(),
            });
        }
    }

    fn start_edit_evaluation(&mut self, editing_score: bool) {
        let Some(DashboardRow::Evaluation(s, e)) = self.selected_dashboard_row() else {
            return;
        };
        let Some((subject_id, evaluation)) = self.evaluation_at(s, e) else {
            return;
        };

        let subject_id = subject_id.to_string();
        let evaluation_id = evaluation.id.clone();
        let (target, buffer) = if editing_score {
            (
                InputTarget::Score {
                    subject_id,
                    evaluation_id,
                },
                evaluation.score.to_string(),
            )
        } else {
            (
                InputTarget::Date {
                    subject_id,
                    evaluation_id,
                },
                evaluation.date.clone(),
            )
        };
        self.input = Some(TextInput { target, buffer });
    }

    async fn confirm_input(&mut self) {
        let Some(input) = self.input.take() else {
            return;
        };
        let text = input.buffer.trim();

        match input.target {
            InputTarget::NewSubject => {
                if let Some(user_id) = self.user_id() {
                    if self.subjects.add_subject(&self.rest, &user_id, text).await {
                        self.selected_index = 0;
                    }
                }
            }
            InputTarget::NewTopic => {
                if let Some(view) = self.topics.as_mut() {
                    view.add_topic(&self.rest, text).await;
                }
            }
            InputTarget::NewEvaluation { subject_id } => {
                let mut parts = text.split_whitespace();
                match (parts.next(), parts.next()) {
                    (Some(date), Some(score)) => {
                        self.dashboard
                            .add_evaluation(&self.rest, &subject_id, date, score)
                            .await;
                    }
                    _ => {
                        self.dashboard.error =
                            Some("Informe data e nota (AAAA-MM-DD nota)".to_string());
                    }
                }
            }
            InputTarget::Score {
                subject_id,
                evaluation_id,
            } => match parse_score(text) {
                Ok(score) => {
                    let patch = EvaluationPatch {
                        score: Some(score),
                        ..Default::default()
                    };
                    self.dashboard
                        .update_evaluation(&self.rest, &subject_id, &evaluation_id, patch)
                        .await;
                }
                Err(e) => self.dashboard.error = Some(e.to_string()),
            },
            InputTarget::Date {
                subject_id,
                evaluation_id,
            } => match parse_date(text) {
                Ok(date) => {
                    let patch = EvaluationPatch {
                        date: Some(date.format("%Y-%m-%d").to_string()),
                        ..Default::default()
                    };
                    self.dashboard
                        .update_evaluation(&self.rest, &subject_id, &evaluation_id, patch)
                        .await;
                }
                Err(e) => self.dashboard.error = Some(e.to_string()),
            },
        }
    }

    async fn submit_login(&mut self) {
        if !self.login.is_complete() {
            self.login.error = Some("Informe email e senha".to_string());
            return;
        }

        self.login.loading = true;
        self.login.error = None;
        self.login.notice = None;
        let email = self.login.email.trim().to_string();
        let password = self.login.password.clone();

        match self.login.mode {
            AuthMode::SignIn => {
                let result = self.session.sign_in(&email, &password).await.map(|_| ());
                match result {
                    Ok(()) => self.after_sign_in().await,
                    Err(e) => self.login.sign_in_failed(&e),
                }
            }
            AuthMode::SignUp => match self.session.sign_up(&email, &password).await {
                Ok(true) => self.after_sign_in().await,
                Ok(false) => {
                    self.login = LoginForm::new(AuthMode::SignIn);
                    self.login.email = email;
                    self.login.notice = Some(
                        "Conta criada! Verifique seu email para confirmar o cadastro.".to_string(),
                    );
                    self.navigate(Route::Login).await;
                }
                Err(e) => self.login.sign_up_failed(&e),
            },
        }

        self.login.loading = false;
    }

    async fn after_sign_in(&mut self) {
        self.rest
            .set_access_token(self.session.access_token().map(str::to_string));
        self.login = LoginForm::new(AuthMode::SignIn);
        self.navigate(Route::Subjects).await;
    }

    /// Renew the access token ahead of expiry. A session that can no longer be
    /// renewed sends the user back to the login route.
    async fn keep_session_fresh(&mut self) -> bool {
        match self.session.ensure_fresh().await {
            Ok(()) => {
                self.rest
                    .set_access_token(self.session.access_token().map(str::to_string));
                true
            }
            Err(e) => {
                tracing::error!("Session renewal failed: {}", e);
                self.reset_views();
                self.login.error = Some("Sessão expirada. Faça login novamente.".to_string());
                self.navigate(Route::Login).await;
                false
            }
        }
    }

    fn reset_views(&mut self) {
        self.rest.set_access_token(None);
        self.subjects = SubjectsView::new(self.subject_limit);
        self.topics = None;
        self.dashboard = DashboardView::new();
        self.login = LoginForm::new(AuthMode::SignIn);
    }

    /// Always ends on the login route, even when the remote sign-out fails.
    pub async fn sign_out(&mut self) {
        let result = self.session.sign_out().await;
        self.reset_views();

        if let Err(e) = result {
            tracing::error!("Error signing out: {}", e);
            self.login.error = Some("Falha ao sair".to_string());
        }

        self.navigate(Route::Login).await;
    }
}
