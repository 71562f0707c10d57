use std::path::PathBuf;
use std::time::{Duration, Instant};

use eframe::egui;
use egui::Color32;
use egui_plot::{Bar, BarChart, Plot};
use log::error;

use crate::dashboard::{ConnectionStatus, Dashboard, DisplayOptions};
use crate::mock::{ConnectionDetails, Details, NetworkSource, NeuronDetails};
use crate::model::{Connection, Network, Neuron, NeuronId};
use crate::render::{Canvas, Pick};
use crate::selection::{Edit, EditorKind, Selection, SelectionState};

/// Everything a panel can ask the dashboard to do.
///
/// Panels only read state while drawing; actions are applied afterwards.
#[derive(Debug, Clone, PartialEq)]
enum Action {
    Pick(Pick),
    ClearSelection,
    SetDisplay(DisplayOptions),
    ToggleEditMode,
    StartEdit(EditorKind),
    CancelEdit,
    Save(Edit),
    Refresh,
    Step,
    ToggleAutoPlay,
    RandomizeActivations,
    RandomizeWeights,
    ScaleActivations(f64),
    ScaleWeights(f64),
    Reset,
    Export,
    Import,
    DismissImportError,
}

/// Editor working copies, seeded from the selection when an editor opens.
#[derive(Debug, Default)]
struct Drafts {
    neuron: Option<(Neuron, Neuron)>,
    connection: Option<(Connection, Connection)>,
}

impl Drafts {
    fn sync(&mut self, network: Option<&Network>, selection: &SelectionState) {
        let network = match (network, selection.active_editor()) {
            (Some(network), Some(_)) => network,
            _ => {
                *self = Self::default();
                return;
            }
        };
        if let Some(neuron) = selection.selected_neuron(network) {
            if self.neuron.as_ref().is_none_or(|(original, _)| original.id != neuron.id) {
                self.neuron = Some((neuron.clone(), neuron.clone()));
            }
        }
        if let Some(connection) = selection.selected_connection(network) {
            if self.connection.as_ref().is_none_or(|(original, _)| original.id != connection.id) {
                self.connection = Some((connection.clone(), connection.clone()));
            }
        }
    }
}

pub struct DashboardApp<S> {
    dashboard: Dashboard<S>,
    canvas: Canvas,
    drafts: Drafts,
    import_path: String,
    notice: Option<String>,
}

impl<S: NetworkSource> DashboardApp<S> {
    pub fn new(mut dashboard: Dashboard<S>) -> Self {
        dashboard.refresh();
        Self {
            dashboard,
            canvas: Canvas::default(),
            drafts: Drafts::default(),
            import_path: String::new(),
            notice: None,
        }
    }

    fn run(&mut self, action: Action) {
        let now = Instant::now();
        match action {
            Action::Pick(Pick::Neuron(id)) => self.dashboard.select_neuron(id),
            Action::Pick(Pick::Connection(id)) => self.dashboard.select_connection(&id),
            Action::ClearSelection => self.dashboard.clear_selection(),
            Action::SetDisplay(display) => self.dashboard.display = display,
            Action::ToggleEditMode => self.dashboard.toggle_edit_mode(),
            Action::StartEdit(kind) => {
                self.dashboard.start_edit(kind);
            }
            Action::CancelEdit => self.dashboard.cancel_edit(),
            Action::Save(edit) => {
                if !self.dashboard.save_edit(&edit) {
                    self.notice = Some("Edit no longer applies to the current selection".into());
                }
            }
            Action::Refresh => self.dashboard.refresh(),
            Action::Step => self.dashboard.step(),
            Action::ToggleAutoPlay => self.dashboard.toggle_autoplay(now),
            Action::RandomizeActivations => self.dashboard.randomize_activations(),
            Action::RandomizeWeights => self.dashboard.randomize_weights(),
            Action::ScaleActivations(f) => self.dashboard.scale_activations(f),
            Action::ScaleWeights(f) => self.dashboard.scale_weights(f),
            Action::Reset => self.dashboard.reset(),
            Action::Export => {
                self.notice = match self.dashboard.export() {
                    Ok(Some(path)) => Some(format!("Exported to {}", path.display())),
                    Ok(None) => Some("Nothing to export yet".into()),
                    Err(err) => {
                        error!("export failed: {err}");
                        Some(format!("Export failed: {err}"))
                    }
                };
            }
            Action::Import => {
                let path = PathBuf::from(self.import_path.trim());
                if self.dashboard.import_file(&path).is_ok() {
                    self.notice = Some(format!("Imported {}", path.display()));
                }
            }
            Action::DismissImportError => self.dashboard.dismiss_import_error(),
        }
    }
}

impl<S: NetworkSource> eframe::App for DashboardApp<S> {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let now = Instant::now();
        self.dashboard.tick(now);
        self.drafts.sync(self.dashboard.network(), self.dashboard.selection());

        let mut actions = Vec::new();
        let dashboard = &self.dashboard;

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            draw_header(ui, dashboard, &mut actions);
        });

        egui::SidePanel::left("controls").min_width(260.0).show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                draw_metadata(ui, dashboard);
                ui.separator();
                draw_controls(ui, dashboard, &mut self.import_path, &mut actions);
                ui.separator();
                draw_layers(ui, dashboard, &mut actions);
            });
        });

        egui::SidePanel::right("details").min_width(280.0).show(ctx, |ui| {
            egui::ScrollArea::vertical().show(ui, |ui| {
                draw_details(ui, dashboard, &mut self.drafts, &mut actions);
                ui.separator();
                draw_activation_chart(ui, dashboard);
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.horizontal(|ui| {
                if ui.button("-").clicked() {
                    self.canvas.zoom_by(0.9);
                }
                if ui.button("+").clicked() {
                    self.canvas.zoom_by(1.1);
                }
                ui.label(format!("Zoom: {:.2}x", self.canvas.zoom()));
                if ui.button("Reset View").clicked() {
                    self.canvas.reset_view();
                }
                if let Some(notice) = &self.notice {
                    ui.separator();
                    ui.label(notice);
                }
            });
            match dashboard.network() {
                Some(network) => {
                    let selection = dashboard.selection().selection();
                    if let Some(pick) = self.canvas.show(ui, network, selection, dashboard.display) {
                        actions.push(Action::Pick(pick));
                    }
                }
                None => {
                    ui.centered_and_justified(|ui| ui.label("Loading network..."));
                }
            }
        });

        for action in actions {
            self.run(action);
        }

        // keep polling while requests are in flight or auto-play is running
        if self.dashboard.is_loading() {
            ctx.request_repaint_after(Duration::from_millis(50));
        } else if let Some(wait) = self.dashboard.autoplay().time_to_next(now) {
            ctx.request_repaint_after(wait);
        }
    }
}

fn draw_header<S: NetworkSource>(ui: &mut egui::Ui, dashboard: &Dashboard<S>, actions: &mut Vec<Action>) {
    ui.horizontal(|ui| {
        let name = dashboard.network().map_or("AEIF Neural Network", |n| n.name.as_str());
        ui.heading(name);
        ui.label("Interactive Neural Network Dashboard");
        ui.separator();
        match dashboard.status() {
            ConnectionStatus::Loading => {
                ui.spinner();
                ui.label("Loading");
            }
            ConnectionStatus::Connected => {
                ui.colored_label(Color32::LIGHT_GREEN, "Connected");
            }
            ConnectionStatus::Disconnected => {
                ui.colored_label(Color32::LIGHT_RED, "Disconnected");
                if ui.button("Retry").clicked() {
                    actions.push(Action::Refresh);
                }
            }
        }
        if let Some(network) = dashboard.network() {
            ui.separator();
            ui.label(format!(
                "Last updated: {}",
                network.metadata.last_updated.format("%H:%M:%S")
            ));
        }
    });
    if let Some(err) = dashboard.last_error() {
        ui.colored_label(Color32::LIGHT_RED, err);
    }
    if let Some(err) = dashboard.import_error() {
        ui.horizontal(|ui| {
            ui.colored_label(Color32::LIGHT_RED, format!("Import failed: {err}"));
            if ui.small_button("Dismiss").clicked() {
                actions.push(Action::DismissImportError);
            }
        });
    }
}

fn draw_metadata<S: NetworkSource>(ui: &mut egui::Ui, dashboard: &Dashboard<S>) {
    let Some(network) = dashboard.network() else {
        return;
    };
    let meta = &network.metadata;
    egui::Grid::new("metadata").num_columns(2).show(ui, |ui| {
        ui.label("Accuracy");
        ui.label(format!("{:.1}%", meta.accuracy * 100.0));
        ui.end_row();
        ui.label("Loss");
        ui.label(format!("{:.4}", meta.loss));
        ui.end_row();
        ui.label("Epoch");
        ui.label(meta.epoch.to_string());
        ui.end_row();
        ui.label("Learning rate");
        ui.label(meta.learning_rate.to_string());
        ui.end_row();
    });
}

fn draw_controls<S: NetworkSource>(
    ui: &mut egui::Ui,
    dashboard: &Dashboard<S>,
    import_path: &mut String,
    actions: &mut Vec<Action>,
) {
    ui.heading("Controls");
    let loading = dashboard.is_loading();
    ui.horizontal(|ui| {
        let play = if dashboard.autoplay().is_enabled() { "Pause" } else { "Play" };
        if ui.button(play).clicked() {
            actions.push(Action::ToggleAutoPlay);
        }
        if ui.add_enabled(!loading, egui::Button::new("Step")).clicked() {
            actions.push(Action::Step);
        }
        if ui.add_enabled(!loading, egui::Button::new("Refresh")).clicked() {
            actions.push(Action::Refresh);
        }
    });

    let mut display = dashboard.display;
    ui.checkbox(&mut display.show_labels, "Show labels");
    ui.checkbox(&mut display.show_weights, "Show weights");
    if display != dashboard.display {
        actions.push(Action::SetDisplay(display));
    }

    let mut edit_mode = dashboard.selection().edit_mode();
    if ui.toggle_value(&mut edit_mode, "Edit mode").clicked() {
        actions.push(Action::ToggleEditMode);
    }

    ui.separator();
    ui.label("Quick actions");
    ui.horizontal(|ui| {
        if ui.button("Random activations").clicked() {
            actions.push(Action::RandomizeActivations);
        }
        if ui.button("Random weights").clicked() {
            actions.push(Action::RandomizeWeights);
        }
    });
    ui.horizontal(|ui| {
        ui.label("Activations:");
        if ui.small_button("×0.8").clicked() {
            actions.push(Action::ScaleActivations(0.8));
        }
        if ui.small_button("×1.2").clicked() {
            actions.push(Action::ScaleActivations(1.2));
        }
    });
    ui.horizontal(|ui| {
        ui.label("Weights:");
        if ui.small_button("×0.8").clicked() {
            actions.push(Action::ScaleWeights(0.8));
        }
        if ui.small_button("×1.2").clicked() {
            actions.push(Action::ScaleWeights(1.2));
        }
    });

    ui.separator();
    ui.label("Data");
    if ui.button("Export").clicked() {
        actions.push(Action::Export);
    }
    ui.horizontal(|ui| {
        ui.text_edit_singleline(import_path);
        if ui
            .add_enabled(!import_path.trim().is_empty(), egui::Button::new("Import"))
            .clicked()
        {
            actions.push(Action::Import);
        }
    });
    if ui.button("Reset network").clicked() {
        actions.push(Action::Reset);
    }

    ui.separator();
    let stats = dashboard.stats();
    egui::Grid::new("stats").num_columns(2).show(ui, |ui| {
        ui.label("Total neurons");
        ui.label(stats.neuron_count.to_string());
        ui.end_row();
        ui.label("Total connections");
        ui.label(stats.connection_count.to_string());
        ui.end_row();
        ui.label("Mean |weight|");
        ui.label(format!("{:.3}", stats.mean_abs_weight));
        ui.end_row();
        ui.label("Mean activation");
        ui.label(format!("{:.3}", stats.mean_activation));
        ui.end_row();
    });
}

fn draw_layers<S: NetworkSource>(ui: &mut egui::Ui, dashboard: &Dashboard<S>, actions: &mut Vec<Action>) {
    let Some(network) = dashboard.network() else {
        return;
    };
    ui.heading("Network Layers");
    let selection = dashboard.selection().selection();
    for layer in &network.layers {
        let [r, g, b] = layer.layer_type.color();
        egui::CollapsingHeader::new(format!("{} ({} neurons)", layer.name, layer.neurons.len()))
            .id_salt(&layer.id)
            .default_open(true)
            .show(ui, |ui| {
                for neuron in &layer.neurons {
                    ui.horizontal(|ui| {
                        let selected = *selection == Selection::Neuron(neuron.id);
                        if ui.selectable_label(selected, &neuron.label).clicked() {
                            actions.push(Action::Pick(Pick::Neuron(neuron.id)));
                        }
                        ui.add(
                            egui::ProgressBar::new(neuron.activation as f32)
                                .desired_width(80.0)
                                .fill(Color32::from_rgb(r, g, b)),
                        );
                        ui.label(format!("{:.3}", neuron.activation));
                    });
                }
            });
    }
}

fn draw_details<S: NetworkSource>(
    ui: &mut egui::Ui,
    dashboard: &Dashboard<S>,
    drafts: &mut Drafts,
    actions: &mut Vec<Action>,
) {
    let Some(network) = dashboard.network() else {
        return;
    };
    let state = dashboard.selection();
    let loading = dashboard.is_loading();
    let (neuron_details, connection_details) = match dashboard.details() {
        Some(Details::Neuron(d)) => (Some(d), None),
        Some(Details::Connection(d)) => (None, Some(d)),
        None => (None, None),
    };
    match state.active_editor() {
        Some(EditorKind::Neuron) => {
            if let Some((original, draft)) = drafts.neuron.as_mut() {
                let layer_type = network.layer_of(draft.id).map_or("unknown", |l| l.layer_type.label());
                draw_neuron_editor(ui, original, draft, layer_type, actions);
                draw_neuron_readouts(ui, neuron_details, loading);
            }
            return;
        }
        Some(EditorKind::Connection) => {
            if let Some((original, draft)) = drafts.connection.as_mut() {
                draw_connection_editor(ui, network, original, draft, actions);
                draw_connection_readouts(ui, connection_details, loading);
            }
            return;
        }
        None => {}
    }

    if let Some(neuron) = state.selected_neuron(network) {
        ui.heading("Neuron Details");
        let layer = network.layer_of(neuron.id);
        ui.label(format!("{} (#{})", neuron.label, neuron.id));
        ui.label(format!("Layer: {}", layer.map_or("unknown", |l| l.name.as_str())));
        ui.label(format!("Activation: {:.3}", neuron.activation));
        ui.label(format!(
            "Position: ({:.1}, {:.1}, {:.1})",
            neuron.position.x, neuron.position.y, neuron.position.z
        ));
        ui.label(format!("Connections: {}", network.connections_touching(neuron.id).len()));
        draw_neuron_readouts(ui, neuron_details, loading);
        detail_buttons(ui, state, EditorKind::Neuron, actions);
    } else if let Some(connection) = state.selected_connection(network) {
        ui.heading("Connection Details");
        ui.label(format!("{}: {} → {}", connection.id, endpoint(network, connection.from), endpoint(network, connection.to)));
        ui.label(format!("Weight: {:.3}", connection.weight));
        ui.label(format!("Strength: {:.3}", connection.strength));
        draw_connection_readouts(ui, connection_details, loading);
        detail_buttons(ui, state, EditorKind::Connection, actions);
    } else {
        ui.label("Click a neuron or a connection to inspect it.");
    }
}

fn detail_buttons(ui: &mut egui::Ui, state: &SelectionState, kind: EditorKind, actions: &mut Vec<Action>) {
    ui.horizontal(|ui| {
        if ui
            .add_enabled(state.edit_mode(), egui::Button::new("Edit"))
            .on_disabled_hover_text("Turn on edit mode first")
            .clicked()
        {
            actions.push(Action::StartEdit(kind));
        }
        if ui.button("Deselect").clicked() {
            actions.push(Action::ClearSelection);
        }
    });
}

fn draw_neuron_readouts(ui: &mut egui::Ui, details: Option<&NeuronDetails>, loading: bool) {
    ui.separator();
    let Some(d) = details else {
        no_readouts(ui, loading);
        return;
    };
    egui::Grid::new("neuron_readouts").num_columns(2).show(ui, |ui| {
        ui.label("Bias");
        ui.label(format!("{:.4}", d.bias));
        ui.end_row();
        ui.label("Gradient");
        ui.label(format!("{:.4}", d.gradient));
        ui.end_row();
        ui.label("Input sum");
        ui.label(format!("{:.4}", d.input_sum));
        ui.end_row();
        ui.label("Last activation");
        ui.label(format!("{:.3}", d.last_activation));
        ui.end_row();
        ui.label("Function");
        ui.label(d.activation_function.as_str());
        ui.end_row();
    });
}

fn draw_connection_readouts(ui: &mut egui::Ui, details: Option<&ConnectionDetails>, loading: bool) {
    ui.separator();
    let Some(d) = details else {
        no_readouts(ui, loading);
        return;
    };
    egui::Grid::new("connection_readouts").num_columns(2).show(ui, |ui| {
        ui.label("Gradient");
        ui.label(format!("{:.6}", d.gradient));
        ui.end_row();
        ui.label("Momentum");
        ui.label(format!("{:.4}", d.momentum));
        ui.end_row();
        ui.label("Last update");
        ui.label(format!("{:.6}", d.last_update));
        ui.end_row();
        ui.label("Learning rate");
        ui.label(d.learning_rate.to_string());
        ui.end_row();
    });
}

fn no_readouts(ui: &mut egui::Ui, loading: bool) {
    if loading {
        ui.horizontal(|ui| {
            ui.spinner();
            ui.label("Loading details");
        });
    } else {
        ui.weak("No further details");
    }
}

fn endpoint(network: &Network, id: NeuronId) -> String {
    network
        .find_neuron(id)
        .map_or_else(|| format!("#{id} (missing)"), |n| n.label.clone())
}

fn draw_neuron_editor(
    ui: &mut egui::Ui,
    original: &Neuron,
    draft: &mut Neuron,
    layer_type: &str,
    actions: &mut Vec<Action>,
) {
    ui.heading("Neuron Editor");
    ui.label(format!("Neuron ID: {} ({layer_type})", draft.id));
    ui.horizontal(|ui| {
        ui.label("Label");
        ui.text_edit_singleline(&mut draft.label);
    });
    ui.add(egui::Slider::new(&mut draft.activation, 0.0..=1.0).text("Activation"));
    ui.horizontal(|ui| {
        ui.label("Position");
        ui.add(egui::DragValue::new(&mut draft.position.x).speed(0.1).prefix("x "));
        ui.add(egui::DragValue::new(&mut draft.position.y).speed(0.1).prefix("y "));
        ui.add(egui::DragValue::new(&mut draft.position.z).speed(0.1).prefix("z "));
    });
    editor_buttons(ui, draft != original, || Edit::Neuron(draft.clone()), actions);
    if ui.button("Revert").clicked() {
        *draft = original.clone();
    }
}

fn draw_connection_editor(
    ui: &mut egui::Ui,
    network: &Network,
    original: &Connection,
    draft: &mut Connection,
    actions: &mut Vec<Action>,
) {
    ui.heading("Connection Editor");
    ui.label(format!("Connection ID: {}", draft.id));
    ui.label(format!("{} → {}", endpoint(network, draft.from), endpoint(network, draft.to)));
    ui.add(egui::Slider::new(&mut draft.weight, -1.0..=1.0).text("Weight"));
    ui.add(egui::Slider::new(&mut draft.strength, 0.0..=1.0).text("Strength"));
    if ui.small_button("Strength = |weight|").clicked() {
        draft.strength = draft.weight.abs();
    }
    editor_buttons(ui, draft != original, || Edit::Connection(draft.clone()), actions);
    if ui.button("Revert").clicked() {
        *draft = original.clone();
    }
}

fn editor_buttons(ui: &mut egui::Ui, changed: bool, edit: impl FnOnce() -> Edit, actions: &mut Vec<Action>) {
    ui.horizontal(|ui| {
        if ui.add_enabled(changed, egui::Button::new("Save")).clicked() {
            actions.push(Action::Save(edit()));
        }
        if ui.button("Cancel").clicked() {
            actions.push(Action::CancelEdit);
        }
    });
}

fn draw_activation_chart<S: NetworkSource>(ui: &mut egui::Ui, dashboard: &Dashboard<S>) {
    let Some(network) = dashboard.network() else {
        return;
    };
    ui.heading("Activations");
    let bars: Vec<Bar> = network
        .layers
        .iter()
        .flat_map(|layer| {
            let [r, g, b] = layer.layer_type.color();
            layer.neurons.iter().map(move |n| {
                Bar::new(n.id as f64, n.activation)
                    .name(&n.label)
                    .fill(Color32::from_rgb(r, g, b))
            })
        })
        .collect();
    Plot::new("activation_chart")
        .height(160.0)
        .include_y(0.0)
        .include_y(1.0)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .show(ui, |plot_ui| plot_ui.bar_chart(BarChart::new(bars).width(0.7)));
}
