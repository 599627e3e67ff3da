use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame,
};

use crate::app::{App, Route, Tab};
use crate::models::format_score;
use crate::views::{AuthMode, DashboardRow, DashboardView, LoginField, SCHEDULE_PLACEHOLDER};

pub fn draw(frame: &mut Frame, app: &App) {
    if app.on_login() {
        render_login(frame, app);
    } else {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Navigation
                Constraint::Min(0),    // Route content
                Constraint::Length(1), // Status / error banner
            ])
            .split(frame.area());

        render_navigation(frame, app, chunks[0]);
        match &app.route {
            Route::Subjects => render_subjects(frame, app, chunks[1]),
            Route::Topics(_) => render_topics(frame, app, chunks[1]),
            Route::Dashboard => render_dashboard(frame, app, chunks[1]),
            Route::Schedule => render_schedule(frame, chunks[1]),
            Route::Login | Route::Register => {}
        }
        render_status(frame, app, chunks[2]);
    }

    // Render text input popup if active
    if let Some(input) = &app.input {
        render_input(frame, input.target.prompt(), &input.buffer);
    }

    // Render help popup if active
    if app.show_help {
        render_help(frame);
    }
}

fn render_navigation(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = Tab::ALL.iter().map(|t| Line::from(t.label())).collect();
    let selected = app
        .route
        .tab()
        .and_then(|tab| Tab::ALL.iter().position(|t| *t == tab))
        .unwrap_or(0);
    let user = app.user_email().unwrap_or("");

    let tabs = Tabs::new(titles)
        .block(
            Block::default()
                .title(" Estudos ")
                .title_bottom(Line::from(format!(" {user} ")).right_aligned())
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan)),
        )
        .select(selected)
        .style(Style::default().fg(Color::White))
        .highlight_style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
        );

    frame.render_widget(tabs, area);
}

fn current_error(app: &App) -> Option<&str> {
    match &app.route {
        Route::Subjects => app.subjects.error.as_deref(),
        Route::Topics(_) => app.topics.as_ref().and_then(|v| v.error.as_deref()),
        Route::Dashboard => app.dashboard.error.as_deref(),
        _ => None,
    }
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
    let paragraph = if let Some(error) = current_error(app) {
        Paragraph::new(error).style(Style::default().fg(Color::Red))
    } else {
        let hints = match app.route {
            Route::Subjects => "j/k:nav  Enter:abrir  a:adicionar  r:atualizar  L:sair  ?:ajuda  q:fechar",
            Route::Topics(_) => "j/k:nav  espaço:concluir  a:adicionar  Esc:voltar  ?:ajuda",
            Route::Dashboard => "j/k:nav  espaço:concluir  a:avaliação  e:nota  t:data  ?:ajuda",
            _ => "1-3:navegar  L:sair  ?:ajuda  q:fechar",
        };
        Paragraph::new(hints).style(Style::default().fg(Color::DarkGray))
    };
    frame.render_widget(paragraph, area);
}

fn render_subjects(frame: &mut Frame, app: &App, area: Rect) {
    let view = &app.subjects;
    let title = format!(
        " Minhas Disciplinas ({}/{}) ",
        view.subjects.len(),
        view.limit()
    );
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    if view.loading {
        frame.render_widget(Paragraph::new("Carregando...").block(block), area);
        return;
    }
    if view.subjects.is_empty() {
        let text = "Nenhuma disciplina ainda. Pressione 'a' para adicionar sua primeira disciplina!";
        frame.render_widget(
            Paragraph::new(text)
                .block(block)
                .style(Style::default().fg(Color::DarkGray))
                .wrap(Wrap { trim: true }),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = view
        .subjects
        .iter()
        .map(|subject| {
            let created = subject.created_at.format("%d/%m/%Y").to_string();
            ListItem::new(Line::from(vec![
                Span::styled(subject.title.as_str(), Style::default().fg(Color::White)),
                Span::styled(
                    format!("  Criada em {created}"),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    render_list(frame, items, block, app.selected_index, area);
}

fn render_topics(frame: &mut Frame, app: &App, area: Rect) {
    let Some(view) = &app.topics else {
        return;
    };

    let title = match &view.subject {
        Some(subject) => format!(
            " {} ({}/{} concluídos) ",
            subject.title,
            view.completed_count(),
            view.topics.len()
        ),
        None => " Assuntos ".to_string(),
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    if view.loading {
        frame.render_widget(Paragraph::new("Carregando...").block(block), area);
        return;
    }
    if view.subject.is_none() {
        frame.render_widget(Paragraph::new("Disciplina não encontrada").block(block), area);
        return;
    }
    if view.topics.is_empty() {
        let text = "Nenhum assunto ainda. Pressione 'a' para adicionar o primeiro!";
        frame.render_widget(
            Paragraph::new(text)
                .block(block)
                .style(Style::default().fg(Color::DarkGray)),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = view
        .topics
        .iter()
        .map(|topic| {
            let (mark, style) = if topic.completed {
                (
                    "✓ ",
                    Style::default()
                        .fg(Color::DarkGray)
                        .add_modifier(Modifier::CROSSED_OUT),
                )
            } else {
                ("✗ ", Style::default().fg(Color::White))
            };
            let mark_color = if topic.completed { Color::Green } else { Color::DarkGray };
            ListItem::new(Line::from(vec![
                Span::styled(mark, Style::default().fg(mark_color)),
                Span::styled(topic.title.as_str(), style),
                Span::styled(
                    format!("  {}", topic.created_at.format("%d/%m/%Y")),
                    Style::default().fg(Color::DarkGray),
                ),
            ]))
        })
        .collect();

    render_list(frame, items, block, app.selected_index, area);
}

fn render_dashboard(frame: &mut Frame, app: &App, area: Rect) {
    let view = &app.dashboard;
    let block = Block::default()
        .title(" Painel ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta));

    if view.loading {
        frame.render_widget(Paragraph::new("Carregando...").block(block), area);
        return;
    }
    if view.subjects.is_empty() {
        let text = "Nenhuma disciplina cadastrada. Vá para a página de Disciplinas (1) para começar!";
        frame.render_widget(
            Paragraph::new(text)
                .block(block)
                .style(Style::default().fg(Color::DarkGray))
                .wrap(Wrap { trim: true }),
            area,
        );
        return;
    }

    let items: Vec<ListItem> = view
        .rows()
        .into_iter()
        .filter_map(|row| dashboard_line(view, row))
        .map(ListItem::new)
        .collect();

    render_list(frame, items, block, app.selected_index, area);
}

fn dashboard_line(view: &DashboardView, row: DashboardRow) -> Option<Line<'_>> {
    let check = |done: bool| {
        if done {
            Span::styled("[✓] ", Style::default().fg(Color::Green))
        } else {
            Span::styled("[ ] ", Style::default().fg(Color::DarkGray))
        }
    };

    let line = match row {
        DashboardRow::Subject(s) => {
            let subject = view.subjects.get(s)?;
            let mut spans = vec![
                Span::styled(
                    subject.subject.title.as_str(),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!(
                        "  {}/{} assuntos",
                        subject.completed_topics(),
                        subject.topics.len()
                    ),
                    Style::default().fg(Color::DarkGray),
                ),
            ];
            if let Some(average) = DashboardView::average_label(subject) {
                spans.push(Span::styled(
                    format!("  Média: {average}"),
                    Style::default().fg(Color::Cyan),
                ));
            }
            Line::from(spans)
        }
        DashboardRow::Topic(s, t) => {
            let topic = view.subjects.get(s)?.topics.get(t)?;
            Line::from(vec![
                Span::raw("    "),
                check(topic.completed),
                Span::raw(topic.title.as_str()),
            ])
        }
        DashboardRow::Evaluation(s, e) => {
            let evaluation = view.subjects.get(s)?.subject.evaluations.get(e)?;
            Line::from(vec![
                Span::raw("    "),
                check(evaluation.completed),
                Span::styled("Avaliação ", Style::default().fg(Color::Blue)),
                Span::raw(format!(
                    "{}  nota {}",
                    evaluation.date,
                    format_score(evaluation.score)
                )),
            ])
        }
    };
    Some(line)
}

fn render_schedule(frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .title(" Agenda ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue));
    frame.render_widget(
        Paragraph::new(SCHEDULE_PLACEHOLDER)
            .block(block)
            .style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

fn render_list(frame: &mut Frame, items: Vec<ListItem>, block: Block, selected: usize, area: Rect) {
    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(selected));

    frame.render_stateful_widget(list, area, &mut state);
}

fn render_login(frame: &mut Frame, app: &App) {
    let form = &app.login;
    let area = centered_rect(60, 60, frame.area());

    let title = match form.mode {
        AuthMode::SignIn => " Entre na sua conta ",
        AuthMode::SignUp => " Crie uma nova conta ",
    };
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let field = |label: &'static str, value: String, focused: bool| {
        let style = if focused {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default().fg(Color::White)
        };
        let cursor = if focused { "_" } else { "" };
        Line::from(vec![
            Span::styled(format!("{label:<7}"), Style::default().fg(Color::DarkGray)),
            Span::styled(format!("{value}{cursor}"), style),
        ])
    };

    let masked = "*".repeat(form.password.chars().count());
    let action = match (form.mode, form.loading) {
        (_, true) => "Entrando...",
        (AuthMode::SignIn, false) => "Enter: Entrar   Ctrl+R: criar uma nova conta",
        (AuthMode::SignUp, false) => "Enter: Cadastrar   Ctrl+R: já tenho conta",
    };

    let mut lines = vec![
        Line::from(""),
        field("Email", form.email.clone(), form.focus == LoginField::Email),
        field("Senha", masked, form.focus == LoginField::Password),
        Line::from(""),
        Line::styled(action, Style::default().fg(Color::DarkGray)),
        Line::styled("Tab: trocar campo   Esc: fechar", Style::default().fg(Color::DarkGray)),
        Line::from(""),
    ];
    if let Some(notice) = &form.notice {
        lines.push(Line::styled(notice.as_str(), Style::default().fg(Color::Green)));
    }
    if let Some(error) = &form.error {
        lines.push(Line::styled(error.as_str(), Style::default().fg(Color::Red)));
    }

    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
        area,
    );
}

fn render_input(frame: &mut Frame, prompt: &str, buffer: &str) {
    let area = centered_rect(60, 20, frame.area());

    let block = Block::default()
        .title(prompt.to_string())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let inner = block.inner(area);

    // Clear the area first
    frame.render_widget(Clear, area);
    frame.render_widget(block, area);

    let input_text = format!("> {buffer}_");
    let paragraph = Paragraph::new(input_text).style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, inner);
}

fn render_help(frame: &mut Frame) {
    let area = centered_rect(50, 70, frame.area());

    let help_text = [
        "",
        " Navegação:",
        "   j / ↓    Descer",
        "   k / ↑    Subir",
        "   Enter    Abrir disciplina",
        "   Esc      Voltar",
        "   1 2 3    Disciplinas / Painel / Agenda",
        "",
        " Ações:",
        "   a        Adicionar disciplina, assunto ou avaliação",
        "   espaço   Marcar como concluído",
        "   e        Editar nota da avaliação",
        "   t        Editar data da avaliação",
        "   r        Atualizar",
        "",
        " Geral:",
        "   L        Sair da conta",
        "   ?        Mostrar esta ajuda",
        "   q        Fechar",
        "",
        " Pressione qualquer tecla para fechar",
    ];

    let block = Block::default()
        .title(" Ajuda ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let paragraph = Paragraph::new(help_text.join("\n"))
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
