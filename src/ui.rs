use ratatui::{
    Frame,
    layout::{Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span, Text},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table},
};

use crate::domain::{HELP_TEXT, Route, SortKey};
use crate::model::{ListViewData, Model, RowView, Status};

pub const SEARCH_HEIGHT: u16 = 3;
pub const CONTROLS_HEIGHT: u16 = 3;
pub const PAGINATION_HEIGHT: u16 = 3;
pub const STATUSLINE_HEIGHT: u16 = 1;
pub const MIN_WIDTH: usize = 60;
pub const MIN_HEIGHT: usize = 16;
pub const EMPTY_PLACEHOLDER: &str = "No data found";
pub const LOADING_PLACEHOLDER: &str = "Loading users...";

const FILTER_CHOICES: [&str; 2] = ["Active", "Inactive"];

#[derive(Debug)]
pub struct ListUI {
    source: String,
}

impl ListUI {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
        }
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let data = model.view_data();
        let area = frame.area();
        match data.route {
            Route::Login => self.draw_login(frame, area),
            Route::Edit => self.draw_edit(&data, frame, area),
        }
        if data.show_help {
            draw_help(frame, area);
        }
    }

    fn draw_login(&self, frame: &mut Frame, area: Rect) {
        let popup = centered_rect(50, 11, area);
        let block = Block::bordered()
            .title(Line::from(" Login ".bold()).centered())
            .title_bottom(
                Line::from(vec![
                    " Open user list ".into(),
                    "<E> ".blue().bold(),
                    " Quit ".into(),
                    "<Q> ".blue().bold(),
                ])
                .centered(),
            )
            .border_set(border::THICK);

        let form = Text::from(vec![
            Line::from(""),
            Line::from(vec!["Username: ".into(), "________________".dark_gray()]),
            Line::from(""),
            Line::from(vec!["Password: ".into(), "________________".dark_gray()]),
            Line::from(""),
            Line::from("[ Sign in ]".dark_gray()).centered(),
        ]);

        frame.render_widget(Clear, popup);
        frame.render_widget(Paragraph::new(form).block(block), popup);
    }

    fn draw_edit(&self, data: &ListViewData, frame: &mut Frame, area: Rect) {
        if data.width < MIN_WIDTH || data.height < MIN_HEIGHT {
            let msg = format!(
                "Terminal too small ({}x{}), need at least {MIN_WIDTH}x{MIN_HEIGHT}",
                data.width, data.height
            );
            frame.render_widget(Paragraph::new(msg).centered(), area);
            return;
        }

        let [search, controls, table, pagination, statusline] = Layout::vertical([
            Constraint::Length(SEARCH_HEIGHT),
            Constraint::Length(CONTROLS_HEIGHT),
            Constraint::Min(3),
            Constraint::Length(PAGINATION_HEIGHT),
            Constraint::Length(STATUSLINE_HEIGHT),
        ])
        .areas(area);

        draw_search(data, frame, search);
        draw_controls(data, frame, controls);
        self.draw_table(data, frame, table);
        draw_pagination(data, frame, pagination);

        let status = Line::from(vec![
            format!(" {} ", data.status_message).into(),
            "  ? for help".dark_gray(),
        ]);
        frame.render_widget(Paragraph::new(status).reversed(), statusline);
    }

    fn draw_table(&self, data: &ListViewData, frame: &mut Frame, area: Rect) {
        let header = Row::new(["#", "Id", "Name", "Email", "Phone", "Address", "Status"])
            .style(Style::new().bold().fg(Color::White).bg(Color::DarkGray));

        let rows: Vec<Row> = if data.rows.is_empty() {
            let placeholder = match data.status {
                Status::Loading => LOADING_PLACEHOLDER,
                _ => EMPTY_PLACEHOLDER,
            };
            vec![Row::new([Cell::from(
                Line::from(placeholder.italic()).centered(),
            )])]
        } else {
            data.rows.iter().map(record_row).collect()
        };

        let widths = if data.rows.is_empty() {
            vec![Constraint::Percentage(100)]
        } else {
            vec![
                Constraint::Length(4),
                Constraint::Length(6),
                Constraint::Fill(2),
                Constraint::Fill(3),
                Constraint::Length(12),
                Constraint::Fill(3),
                Constraint::Length(9),
            ]
        };

        let title = Line::from(vec![
            " Users ".bold(),
            Span::styled(
                format!("({} of {}) ", data.total_rows, self.source),
                Style::new().fg(Color::DarkGray),
            ),
        ]);
        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(1)
            .block(Block::bordered().title(title));
        frame.render_widget(table, area);
    }
}

fn record_row(row: &RowView) -> Row<'static> {
    let r = &row.record;
    let status_style = if r.status.eq_ignore_ascii_case("active") {
        Style::new().fg(Color::Green)
    } else {
        Style::new().fg(Color::Red)
    };
    Row::new(vec![
        Cell::from(row.number.to_string()),
        Cell::from(r.id.to_string()),
        Cell::from(r.name.clone()),
        Cell::from(r.email.clone()),
        Cell::from(r.phone.clone()),
        Cell::from(r.address.clone()),
        Cell::from(r.status.clone()).style(status_style),
    ])
}

fn draw_search(data: &ListViewData, frame: &mut Frame, area: Rect) {
    let border_style = if data.search_active {
        Style::new().fg(Color::Yellow)
    } else {
        Style::new()
    };
    let mut title: Vec<Span> = vec![" Search by name ".into()];
    if data.search_pending {
        title.push("… ".dark_gray());
    }
    let hint = if data.search_active {
        " <Enter> search  <Esc> clear "
    } else {
        " </> edit  <R> reset "
    };
    let block = Block::bordered()
        .border_style(border_style)
        .title(Line::from(title))
        .title_bottom(Line::from(hint.dark_gray()).right_aligned());

    frame.render_widget(
        Paragraph::new(data.search_input.input.as_str()).block(block),
        area,
    );

    if data.search_active {
        let inner_width = area.width.saturating_sub(2);
        let x = area.x + 1 + (data.search_input.curser_pos as u16).min(inner_width);
        frame.set_cursor_position(Position::new(x, area.y + 1));
    }
}

fn draw_controls(data: &ListViewData, frame: &mut Frame, area: Rect) {
    let [sort, filter] =
        Layout::horizontal([Constraint::Fill(3), Constraint::Fill(2)]).areas(area);

    let mut sort_spans: Vec<Span> = Vec::new();
    for (idx, key) in SortKey::ALL.iter().enumerate() {
        if idx > 0 {
            sort_spans.push(" ".into());
        }
        sort_spans.push(choice(key.as_str(), data.sort_key == Some(*key)));
    }
    if data.sort_key.is_none() {
        sort_spans.push("  (none)".dark_gray());
    }
    frame.render_widget(
        Paragraph::new(Line::from(sort_spans)).block(Block::bordered().title(" Sort by <S> ")),
        sort,
    );

    let active = data.status_filter.as_deref();
    let mut filter_spans: Vec<Span> = Vec::new();
    for (idx, status) in FILTER_CHOICES.iter().enumerate() {
        if idx > 0 {
            filter_spans.push(" ".into());
        }
        let selected = active.is_some_and(|s| s.eq_ignore_ascii_case(status));
        filter_spans.push(choice(status, selected));
    }
    frame.render_widget(
        Paragraph::new(Line::from(filter_spans))
            .block(Block::bordered().title(" Filter by status <A/I/X> ")),
        filter,
    );
}

fn choice(label: &str, selected: bool) -> Span<'static> {
    let text = format!(" {label} ");
    if selected {
        Span::styled(text, Style::new().add_modifier(Modifier::REVERSED | Modifier::BOLD))
    } else {
        Span::raw(text)
    }
}

/// `◀ Previous 1 2 3 Next ▶` with the current page highlighted and the
/// arrows dimmed when there is nowhere to go.
pub fn pagination_line(data: &ListViewData) -> Line<'static> {
    let nav = |label: &'static str, enabled: bool| {
        if enabled {
            Span::styled(label, Style::new().bold())
        } else {
            Span::styled(label, Style::new().fg(Color::DarkGray))
        }
    };

    let mut spans = vec![nav("◀ Previous", data.has_previous), " ".into()];
    for page in 0..data.page_count {
        let label = format!(" {} ", page + 1);
        if page == data.current_page {
            spans.push(Span::styled(label, Style::new().reversed().bold()));
        } else {
            spans.push(Span::raw(label));
        }
    }
    spans.push(" ".into());
    spans.push(nav("Next ▶", data.has_next));
    Line::from(spans).centered()
}

fn draw_pagination(data: &ListViewData, frame: &mut Frame, area: Rect) {
    frame.render_widget(
        Paragraph::new(pagination_line(data)).block(Block::bordered()),
        area,
    );
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let height = HELP_TEXT.lines().count() as u16 + 2;
    let popup = centered_rect(56, height, area);
    frame.render_widget(Clear, popup);
    frame.render_widget(
        Paragraph::new(HELP_TEXT).block(
            Block::bordered()
                .title(Line::from(" Help ".bold()).centered())
                .border_set(border::THICK),
        ),
        popup,
    );
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
