use crate::ir::DiagramNode;
use unicode_width::UnicodeWidthStr;

/// Text metrics for estimating rendered node sizes.
#[derive(Debug, Clone)]
pub struct TextMetrics {
    pub char_width: f64,
    pub line_height: f64,
    pub padding_x: f64,
    pub padding_y: f64,
    pub header_padding: f64,
    /// Room reserved for the key/unique badge in front of a field name.
    pub badge_width: f64,
    pub min_node_width: f64,
    pub min_node_height: f64,
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self {
            char_width: 8.0,
            line_height: 24.0,
            padding_x: 12.0,
            padding_y: 8.0,
            header_padding: 6.0,
            badge_width: 20.0,
            min_node_width: 180.0,
            min_node_height: 60.0,
        }
    }
}

impl TextMetrics {
    pub fn text_width(&self, text: &str) -> f64 {
        let width = UnicodeWidthStr::width(text);
        width as f64 * self.char_width
    }

    pub fn node_size(&self, node: &DiagramNode) -> (f64, f64) {
        let header_width = self.text_width(&node.id);

        let max_field_width = node
            .fields
            .iter()
            .map(|f| {
                let mut typ = f.typ.clone();
                if f.is_list {
                    typ.push_str("[]");
                }
                if f.is_optional {
                    typ.push('?');
                }
                let badge = if f.is_id || f.is_unique { self.badge_width } else { 0.0 };
                badge + self.text_width(&f.name) + self.text_width(&typ) + self.char_width * 2.0
            })
            .fold(0.0, f64::max);

        let content_width = header_width.max(max_field_width) + self.padding_x * 2.0;
        let width = content_width.max(self.min_node_width);

        let header_height = self.line_height + self.header_padding * 2.0;
        let body_height = if node.fields.is_empty() {
            0.0
        } else {
            node.fields.len() as f64 * self.line_height + self.padding_y * 2.0
        };

        let height = (header_height + body_height).max(self.min_node_height);

        (width, height)
    }
}
