use crate::draw::history::DrawHistory;
use crate::draw::model::{Command, CommandBody, CommandKind, Point, StrokeMode, Style};

/// History plus the single live command under construction.
///
/// The live command never appears in history until [`CommandModel::commit_live`]
/// moves it there. Text edits keep their own undo/redo stacks which live only
/// as long as the text session.
#[derive(Debug, Clone, Default)]
pub struct CommandModel {
    history: DrawHistory,
    live: Option<Command>,
    text_undo: Vec<String>,
    text_redo: Vec<String>,
}

impl CommandModel {
    pub fn history(&self) -> &DrawHistory {
        &self.history
    }

    pub fn live(&self) -> Option<&Command> {
        self.live.as_ref()
    }

    pub fn live_kind(&self) -> Option<CommandKind> {
        self.live.as_ref().map(Command::kind)
    }

    /// Replaces any live command. The previous one is dropped, not committed.
    pub fn begin_live(&mut self, command: Command) {
        if command.kind() == CommandKind::Text {
            self.clear_text_history();
        }
        self.live = Some(command);
    }

    pub fn begin_stroke(&mut self, style: Style, mode: StrokeMode, width: f32, start: Point) {
        self.begin_live(Command::stroke(style, mode, width, start));
    }

    pub fn begin_text(&mut self, style: Style, size: f32, anchor: Point) {
        self.begin_live(Command::text(style, size, anchor));
    }

    pub fn append_point(&mut self, point: Point) -> bool {
        match self.live.as_mut().map(|c| &mut c.body) {
            Some(CommandBody::Stroke { points, .. }) => {
                points.push(point);
                true
            }
            _ => false,
        }
    }

    /// Appends a typed character, recording the previous text for text undo.
    /// A carriage return is stored as a newline.
    pub fn append_char(&mut self, ch: char) -> bool {
        let Some(CommandBody::Text { text, .. }) = self.live.as_mut().map(|c| &mut c.body) else {
            return false;
        };
        self.text_undo.push(text.clone());
        self.text_redo.clear();
        text.push(if ch == '\r' { '\n' } else { ch });
        true
    }

    pub fn backspace(&mut self) -> bool {
        let Some(CommandBody::Text { text, .. }) = self.live.as_mut().map(|c| &mut c.body) else {
            return false;
        };
        if text.is_empty() {
            return false;
        }
        self.text_undo.push(text.clone());
        self.text_redo.clear();
        text.pop();
        true
    }

    pub fn set_live_width(&mut self, new_width: f32) {
        if let Some(CommandBody::Stroke { width, .. }) = self.live.as_mut().map(|c| &mut c.body) {
            *width = new_width;
        }
    }

    pub fn set_live_text_size(&mut self, new_size: f32) {
        if let Some(CommandBody::Text { size, .. }) = self.live.as_mut().map(|c| &mut c.body) {
            *size = new_size;
        }
    }

    /// Moves the live command into history. Empty text is dropped silently.
    pub fn commit_live(&mut self) -> bool {
        let Some(command) = self.live.take() else {
            return false;
        };
        if command.kind() == CommandKind::Text {
            self.clear_text_history();
        }
        self.history.commit(command)
    }

    pub fn discard_live(&mut self) -> Option<Command> {
        let command = self.live.take();
        if command.as_ref().map(Command::kind) == Some(CommandKind::Text) {
            self.clear_text_history();
        }
        command
    }

    pub fn undo(&mut self) -> bool {
        self.history.undo()
    }

    pub fn redo(&mut self) -> bool {
        self.history.redo()
    }

    pub fn clear_all(&mut self) {
        self.history.clear_all();
    }

    pub fn text_undo(&mut self) -> bool {
        let Some(CommandBody::Text { text, .. }) = self.live.as_mut().map(|c| &mut c.body) else {
            return false;
        };
        let Some(previous) = self.text_undo.pop() else {
            return false;
        };
        self.text_redo.push(std::mem::replace(text, previous));
        true
    }

    pub fn text_redo(&mut self) -> bool {
        let Some(CommandBody::Text { text, .. }) = self.live.as_mut().map(|c| &mut c.body) else {
            return false;
        };
        let Some(next) = self.text_redo.pop() else {
            return false;
        };
        self.text_undo.push(std::mem::replace(text, next));
        true
    }

    pub fn clear_text_history(&mut self) {
        self.text_undo.clear();
        self.text_redo.clear();
    }

    pub fn text_undo_len(&self) -> usize {
        self.text_undo.len()
    }

    pub fn text_redo_len(&self) -> usize {
        self.text_redo.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_text(model: &CommandModel) -> &str {
        model
            .live()
            .and_then(Command::text_content)
            .expect("live text")
    }

    #[test]
    fn single_point_stroke_commits() {
        let mut model = CommandModel::default();
        model.begin_stroke(Style::default(), StrokeMode::Regular, 6.0, Point::new(3.0, 4.0));
        assert!(model.commit_live());
        assert_eq!(model.history().committed().len(), 1);
        assert_eq!(model.history().committed()[0].points(), &[Point::new(3.0, 4.0)]);
        assert!(model.live().is_none());
    }

    #[test]
    fn commit_without_live_is_a_no_op() {
        let mut model = CommandModel::default();
        assert!(!model.commit_live());
        assert!(!model.append_point(Point::new(1.0, 1.0)));
        assert!(!model.append_char('x'));
    }

    #[test]
    fn empty_text_is_dropped_on_commit() {
        let mut model = CommandModel::default();
        model.begin_text(Style::default(), 36.0, Point::new(0.0, 0.0));
        assert!(!model.commit_live());
        assert!(model.history().committed().is_empty());
        assert!(model.live().is_none());
    }

    #[test]
    fn carriage_return_is_stored_as_newline() {
        let mut model = CommandModel::default();
        model.begin_text(Style::default(), 36.0, Point::new(0.0, 0.0));
        model.append_char('a');
        model.append_char('\r');
        model.append_char('b');
        assert_eq!(live_text(&model), "a\nb");
    }

    #[test]
    fn backspace_on_empty_text_pushes_no_undo() {
        let mut model = CommandModel::default();
        model.begin_text(Style::default(), 36.0, Point::new(0.0, 0.0));
        assert!(!model.backspace());
        assert_eq!(model.text_undo_len(), 0);

        model.append_char('x');
        assert!(model.backspace());
        assert_eq!(live_text(&model), "");
        assert_eq!(model.text_undo_len(), 2);
    }

    #[test]
    fn text_undo_redo_swaps_live_text() {
        let mut model = CommandModel::default();
        model.begin_text(Style::default(), 36.0, Point::new(0.0, 0.0));
        model.append_char('h');
        model.append_char('i');

        assert!(model.text_undo());
        assert_eq!(live_text(&model), "h");
        assert!(model.text_undo());
        assert_eq!(live_text(&model), "");
        assert!(!model.text_undo());

        assert!(model.text_redo());
        assert!(model.text_redo());
        assert_eq!(live_text(&model), "hi");
        assert!(!model.text_redo());

        model.text_undo();
        model.append_char('o');
        assert_eq!(model.text_redo_len(), 0);
        assert_eq!(live_text(&model), "ho");
    }

    #[test]
    fn committing_text_clears_text_history() {
        let mut model = CommandModel::default();
        model.begin_text(Style::default(), 36.0, Point::new(0.0, 0.0));
        model.append_char('a');
        assert!(model.commit_live());
        assert_eq!(model.text_undo_len(), 0);
        assert_eq!(model.history().committed()[0].text_content(), Some("a"));
    }

    #[test]
    fn discard_returns_live_stroke_and_leaves_history_alone() {
        let mut model = CommandModel::default();
        model.begin_stroke(Style::default(), StrokeMode::Regular, 6.0, Point::new(1.0, 1.0));
        model.commit_live();
        let revision = model.history().revision();

        model.begin_stroke(Style::default(), StrokeMode::Regular, 6.0, Point::new(5.0, 5.0));
        model.append_point(Point::new(6.0, 6.0));
        let discarded = model.discard_live().expect("live stroke");
        assert_eq!(discarded.points(), &[Point::new(5.0, 5.0), Point::new(6.0, 6.0)]);
        assert!(model.live().is_none());
        assert_eq!(model.history().committed().len(), 1);
        assert_eq!(model.history().revision(), revision);
        assert!(model.discard_live().is_none());
    }

    #[test]
    fn discarding_text_clears_text_history() {
        let mut model = CommandModel::default();
        model.begin_text(Style::default(), 36.0, Point::new(0.0, 0.0));
        model.append_char('a');
        model.append_char('b');
        model.text_undo();
        assert_eq!(model.text_undo_len(), 1);
        assert_eq!(model.text_redo_len(), 1);

        let discarded = model.discard_live().expect("live text");
        assert_eq!(discarded.text_content(), Some("a"));
        assert_eq!(model.text_undo_len(), 0);
        assert_eq!(model.text_redo_len(), 0);
        assert!(model.history().committed().is_empty());
    }

    #[test]
    fn live_width_follows_updates() {
        let mut model = CommandModel::default();
        model.begin_stroke(Style::default(), StrokeMode::Eraser, 30.0, Point::new(0.0, 0.0));
        model.set_live_width(70.0);
        assert!(matches!(
            model.live().map(|c| &c.body),
            Some(CommandBody::Stroke { width, .. }) if *width == 70.0
        ));
    }
}
