use egui::{Align2, Color32, FontId, Pos2, Rect, Sense, Stroke, Vec2};

use crate::dashboard::DisplayOptions;
use crate::model::{Connection, ConnectionId, LayerType, Network, Neuron, NeuronId, Vector3};
use crate::selection::Selection;

// pixels per world unit at zoom 1.0
const UNIT: f32 = 55.0;
const NODE_RADIUS: f32 = 14.0;
const EDGE_PICK_DISTANCE: f32 = 6.0;

const SELECTED_NEURON: Color32 = Color32::from_rgb(0xff, 0x6b, 0x6b);
const POSITIVE_WEIGHT: [u8; 3] = [0x22, 0xc5, 0x5e];
const NEGATIVE_WEIGHT: [u8; 3] = [0xef, 0x44, 0x44];

/// Something the user clicked on the canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pick {
    Neuron(NeuronId),
    Connection(ConnectionId),
}

/// Layer color dimmed by activation, or the highlight when selected.
pub fn neuron_color(layer_type: LayerType, activation: f64, selected: bool) -> Color32 {
    if selected {
        return SELECTED_NEURON;
    }
    let intensity = 0.3 + 0.7 * activation.clamp(0.0, 1.0);
    let [r, g, b] = layer_type.color().map(|c| (c as f64 * intensity).round() as u8);
    Color32::from_rgb(r, g, b)
}

/// Green for positive weights, red for negative, more opaque the stronger.
pub fn connection_color(weight: f64, selected: bool) -> Color32 {
    if selected {
        return Color32::WHITE;
    }
    let [r, g, b] = if weight >= 0.0 { POSITIVE_WEIGHT } else { NEGATIVE_WEIGHT };
    let opacity = 0.3 + 0.4 * weight.abs().min(1.0);
    Color32::from_rgba_unmultiplied(r, g, b, (opacity * 255.0).round() as u8)
}

pub fn neuron_radius(activation: f64) -> f32 {
    NODE_RADIUS * (0.6 + 0.4 * activation.clamp(0.0, 1.0) as f32)
}

pub fn connection_width(weight: f64) -> f32 {
    1.0 + 4.0 * weight.abs().min(1.0) as f32
}

/// Pan/zoom state of the network view.
#[derive(Debug, Clone)]
pub struct Canvas {
    zoom: f32,
    pan: Vec2,
}

impl Default for Canvas {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan: Vec2::ZERO,
        }
    }
}

impl Canvas {
    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn zoom_by(&mut self, factor: f32) {
        self.zoom = (self.zoom * factor).clamp(0.2, 5.0);
    }

    pub fn reset_view(&mut self) {
        *self = Self::default();
    }

    /// World x/y to screen; z is ignored in this top-down view.
    pub fn project(&self, rect: Rect, p: Vector3) -> Pos2 {
        rect.center() + self.pan + Vec2::new(p.x as f32, -p.y as f32) * UNIT * self.zoom
    }

    pub fn show(
        &mut self,
        ui: &mut egui::Ui,
        network: &Network,
        selection: &Selection,
        display: DisplayOptions,
    ) -> Option<Pick> {
        let (rect, resp) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());

        // Mouse wheel zoom around the pointer
        if let Some(pos) = resp.hover_pos() {
            let scroll = ui.input(|i| i.raw_scroll_delta.y);
            if scroll != 0.0 {
                let anchor = (pos - rect.center() - self.pan) / self.zoom;
                self.zoom_by(1.15_f32.powf(scroll.signum()));
                self.pan = pos - rect.center() - anchor * self.zoom;
            }
        }
        if resp.dragged() {
            self.pan += resp.drag_delta();
        }

        let painter = ui.painter_at(rect);
        let frame = Stroke::new(2.0, Color32::DARK_GRAY);
        let corners = [rect.left_top(), rect.right_top(), rect.right_bottom(), rect.left_bottom()];
        for i in 0..corners.len() {
            painter.line_segment([corners[i], corners[(i + 1) % corners.len()]], frame);
        }

        let neuron_pos = |n: &Neuron| self.project(rect, n.position);
        let edges: Vec<(&Connection, Pos2, Pos2)> = network
            .connections
            .iter()
            .filter_map(|c| {
                // dangling references are not drawn
                let from = network.find_neuron(c.from)?;
                let to = network.find_neuron(c.to)?;
                Some((c, neuron_pos(from), neuron_pos(to)))
            })
            .collect();

        // Connections first so neurons sit on top
        for &(c, from, to) in &edges {
            let selected = matches!(selection, Selection::Connection(id) if *id == c.id);
            let stroke = Stroke::new(connection_width(c.weight) * self.zoom.sqrt(), connection_color(c.weight, selected));
            painter.line_segment([from, to], stroke);
            if display.show_weights {
                painter.text(
                    from + (to - from) * 0.5,
                    Align2::CENTER_CENTER,
                    format!("{:.2}", c.weight),
                    FontId::monospace(10.0),
                    Color32::LIGHT_GRAY,
                );
            }
        }

        for layer in &network.layers {
            let label_pos = self.project(rect, Vector3::new(layer.position.x, layer.position.y + 4.0, layer.position.z));
            painter.text(
                label_pos,
                Align2::CENTER_CENTER,
                &layer.name,
                FontId::proportional(14.0),
                Color32::WHITE,
            );
            for neuron in &layer.neurons {
                let pos = neuron_pos(neuron);
                let selected = *selection == Selection::Neuron(neuron.id);
                let radius = neuron_radius(neuron.activation) * self.zoom;
                painter.circle_filled(pos, radius, neuron_color(layer.layer_type, neuron.activation, selected));
                if display.show_labels {
                    painter.text(
                        pos + Vec2::new(0.0, radius + 8.0),
                        Align2::CENTER_CENTER,
                        &neuron.label,
                        FontId::proportional(11.0),
                        Color32::LIGHT_GRAY,
                    );
                }
            }
        }

        if let Some(pos) = resp.hover_pos() {
            if let Some(neuron) = self.neuron_at(rect, network, pos) {
                let layer_type = network.layer_of(neuron.id).map_or("unknown", |l| l.layer_type.label());
                let info = format!(
                    "{}\nType: {layer_type}\nID: {}\nActivation: {:.3}\nPosition: ({:.1}, {:.1}, {:.1})",
                    neuron.label, neuron.id, neuron.activation, neuron.position.x, neuron.position.y, neuron.position.z,
                );
                draw_info_box(ui, &painter, rect, pos, &info);
            }
        }

        if !resp.clicked() {
            return None;
        }
        let pos = resp.interact_pointer_pos()?;
        if let Some(neuron) = self.neuron_at(rect, network, pos) {
            return Some(Pick::Neuron(neuron.id));
        }
        edges
            .iter()
            .map(|&(c, from, to)| (c, distance_to_segment(pos, from, to)))
            .filter(|&(_, d)| d < EDGE_PICK_DISTANCE)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(c, _)| Pick::Connection(c.id.clone()))
    }

    fn neuron_at<'a>(&self, rect: Rect, network: &'a Network, pos: Pos2) -> Option<&'a Neuron> {
        network.neurons().find(|n| {
            let center = self.project(rect, n.position);
            center.distance(pos) <= neuron_radius(n.activation) * self.zoom
        })
    }
}

fn draw_info_box(ui: &egui::Ui, painter: &egui::Painter, rect: Rect, anchor: Pos2, info: &str) {
    let lines: Vec<&str> = info.lines().collect();
    let line_height = 16.0;
    let padding = 12.0;
    let font = FontId::proportional(13.0);
    let max_line_width = lines
        .iter()
        .map(|line| {
            ui.painter()
                .layout_no_wrap(line.to_string(), font.clone(), Color32::BLACK)
                .size()
                .x
        })
        .fold(0.0_f32, f32::max);
    let size = Vec2::new(max_line_width + 2.0 * padding, lines.len() as f32 * line_height + 2.0 * padding);

    // Right of the pointer, flipped or clamped to stay inside the canvas
    let mut min = anchor + Vec2::new(20.0, -size.y - 10.0);
    if min.x + size.x > rect.right() {
        min.x = anchor.x - size.x - 20.0;
    }
    min.x = min.x.max(rect.left() + 4.0);
    min.y = min.y.clamp(rect.top() + 4.0, (rect.bottom() - size.y - 4.0).max(rect.top()));

    let box_rect = Rect::from_min_size(min, size);
    painter.rect_filled(box_rect, 8.0, Color32::from_rgba_unmultiplied(30, 41, 59, 235));
    for (i, line) in lines.iter().enumerate() {
        painter.text(
            Pos2::new(box_rect.left() + padding, box_rect.top() + padding + (i as f32 + 0.5) * line_height),
            Align2::LEFT_CENTER,
            *line,
            font.clone(),
            Color32::WHITE,
        );
    }
}

// Distance from a point to a line segment
fn distance_to_segment(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let ap = p - a;
    let ab_len = ab.length_sq();
    if ab_len == 0.0 {
        return ap.length();
    }
    let t = ((ap.x * ab.x + ap.y * ab.y) / ab_len).clamp(0.0, 1.0);
    let proj = a + ab * t;
    (p - proj).length()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neuron_color_scales_with_activation() {
        let dim = neuron_color(LayerType::Hidden, 0.0, false);
        let full = neuron_color(LayerType::Hidden, 1.0, false);
        assert_eq!(full, Color32::from_rgb(0x3b, 0x82, 0xf6));
        assert!(dim.b() < full.b());
        assert_eq!(neuron_color(LayerType::Input, 0.5, true), SELECTED_NEURON);
    }

    #[test]
    fn connection_color_follows_sign_and_magnitude() {
        let pos = connection_color(0.5, false);
        let neg = connection_color(-1.0, false);
        let alpha = |w: f64| ((0.3 + 0.4 * w) * 255.0).round() as u8;
        assert_eq!(pos, Color32::from_rgba_unmultiplied(0x22, 0xc5, 0x5e, alpha(0.5)));
        assert_eq!(neg, Color32::from_rgba_unmultiplied(0xef, 0x44, 0x44, alpha(1.0)));
        assert_eq!(pos.a(), alpha(0.5));
        assert_eq!(neg.a(), alpha(1.0));
        assert!(neg.a() > pos.a());
        assert_eq!(connection_color(-0.2, true), Color32::WHITE);
    }

    #[test]
    fn projection_flips_y_and_applies_zoom() {
        let rect = Rect::from_min_size(Pos2::ZERO, Vec2::new(200.0, 100.0));
        let mut canvas = Canvas::default();
        assert_eq!(canvas.project(rect, Vector3::default()), Pos2::new(100.0, 50.0));

        let p = canvas.project(rect, Vector3::new(1.0, 1.0, 9.0));
        assert_eq!(p, Pos2::new(100.0 + UNIT, 50.0 - UNIT));

        canvas.zoom_by(2.0);
        let p = canvas.project(rect, Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(p.x, 100.0 + 2.0 * UNIT);

        canvas.zoom_by(100.0);
        assert_eq!(canvas.zoom(), 5.0);
        canvas.reset_view();
        assert_eq!(canvas.zoom(), 1.0);
    }

    #[test]
    fn segment_distance() {
        let a = Pos2::new(0.0, 0.0);
        let b = Pos2::new(10.0, 0.0);
        assert_eq!(distance_to_segment(Pos2::new(5.0, 3.0), a, b), 3.0);
        assert_eq!(distance_to_segment(Pos2::new(-4.0, 3.0), a, b), 5.0);
        assert_eq!(distance_to_segment(Pos2::new(1.0, 1.0), a, a), 2.0_f32.sqrt());
    }
}
