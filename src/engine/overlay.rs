use egui::epaint::Shadow;

/// Frame statistics, summarized once per second by the caller.
pub struct FrameStats {
    pub fps: u32,
    pub frame_time_avg_ms: f32,
    pub frame_time_min_ms: f32,
    pub frame_time_max_ms: f32,
    pub draw_calls: u32,
    pub triangles: usize,
    pub resolution: (u32, u32),
    pub camera_distance: f32,
}

/// Card for the currently selected part.
pub struct SelectedCard {
    pub name: String,
    pub description: String,
    pub kind: &'static str,
    pub moving: bool,
    /// `Some(open)` for hinged parts.
    pub open: Option<bool>,
    /// Wear fraction, status label and status color.
    pub wear: Option<(f32, &'static str, egui::Color32)>,
}

/// Everything the status panel shows, gathered by the caller each frame.
pub struct StatusPanel {
    pub title: String,
    pub exploded: bool,
    pub auto_rotate: bool,
    pub parts_visible: usize,
    pub parts_total: usize,
    /// System health percentage and its band color, for assemblies with wear.
    pub health: Option<(f32, egui::Color32)>,
    pub selected: Option<SelectedCard>,
    pub failures: Vec<String>,
}

const KEY_HINTS: &[&str] = &[
    "Click: select   Double-click: move",
    "Space: explode   O: open   V: hide   B: show all",
    "Arrows/PgUp/PgDn: move   Q/E R/F Z/C: rotate",
    "Enter: done   Backspace: reset part",
    "=/-: wear   0: reset wear   T: auto-rotate   F3: stats",
];

pub struct StatusOverlay {
    /// F3 frame statistics
    pub stats_visible: bool,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl StatusOverlay {
    pub fn new(
        window: &winit::window::Window,
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
    ) -> Self {
        let egui_ctx = egui::Context::default();

        // Style: dark, semi-transparent, small monospace white font
        let mut visuals = egui::Visuals::dark();
        visuals.window_fill = egui::Color32::from_rgba_premultiplied(0, 0, 0, 180);
        visuals.window_stroke = egui::Stroke::NONE;
        visuals.window_shadow = Shadow::NONE;
        visuals.override_text_color = Some(egui::Color32::WHITE);
        egui_ctx.set_visuals(visuals);

        let mut style = (*egui_ctx.style()).clone();
        style.override_font_id = Some(egui::FontId::monospace(13.0));
        egui_ctx.set_style(style);

        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            window,
            Some(window.scale_factor() as f32),
            None,
            None,
        );

        // No depth: drawn over the finished scene.
        let egui_renderer = egui_wgpu::Renderer::new(device, surface_format, None, 1, false);

        Self {
            stats_visible: false,
            egui_ctx,
            egui_state,
            egui_renderer,
        }
    }

    pub fn toggle_stats(&mut self) {
        self.stats_visible = !self.stats_visible;
    }

    pub fn handle_window_event(
        &mut self,
        window: &winit::window::Window,
        event: &winit::event::WindowEvent,
    ) -> egui_winit::EventResponse {
        self.egui_state.on_window_event(window, event)
    }

    /// True while the pointer is over an overlay panel.
    pub fn wants_pointer(&self) -> bool {
        self.egui_ctx.wants_pointer_input()
    }

    pub fn render(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        window: &winit::window::Window,
        view: &wgpu::TextureView,
        screen_descriptor: &egui_wgpu::ScreenDescriptor,
        panel: &StatusPanel,
        stats: &FrameStats,
    ) {
        let raw_input = self.egui_state.take_egui_input(window);
        let stats_visible = self.stats_visible;

        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            egui::Area::new(egui::Id::new("status_panel"))
                .fixed_pos(egui::pos2(10.0, 10.0))
                .show(ctx, |ui| {
                    panel_frame().show(ui, |ui: &mut egui::Ui| {
                        ui.heading(&panel.title);
                        ui.label(format!(
                            "{}  |  {}/{} parts  |  auto-rotate {}",
                            if panel.exploded { "Exploded" } else { "Assembled" },
                            panel.parts_visible,
                            panel.parts_total,
                            if panel.auto_rotate { "on" } else { "off" },
                        ));
                        if let Some((health, color)) = panel.health {
                            ui.colored_label(color, format!("System health: {health:.0}%"));
                        }
                        for failure in &panel.failures {
                            ui.colored_label(egui::Color32::from_rgb(0xf8, 0x71, 0x71), failure);
                        }
                    });
                });

            if let Some(card) = &panel.selected {
                egui::Area::new(egui::Id::new("selected_card"))
                    .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-10.0, 10.0))
                    .show(ctx, |ui| {
                        panel_frame().show(ui, |ui: &mut egui::Ui| {
                            ui.strong(&card.name);
                            ui.label(&card.description);
                            ui.label(format!("Kind: {}", card.kind));
                            if let Some(open) = card.open {
                                ui.label(if open { "Open" } else { "Closed" });
                            }
                            if let Some((wear, label, color)) = card.wear {
                                ui.colored_label(color, format!("Wear: {:.0}% ({label})", wear * 100.0));
                            }
                            if card.moving {
                                ui.colored_label(egui::Color32::from_rgb(0x22, 0xd3, 0xee), "Moving");
                            }
                        });
                    });
            }

            egui::Area::new(egui::Id::new("key_hints"))
                .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(10.0, -10.0))
                .show(ctx, |ui| {
                    panel_frame().show(ui, |ui: &mut egui::Ui| {
                        for hint in KEY_HINTS {
                            ui.label(*hint);
                        }
                    });
                });

            // ── F3: frame statistics ─────────────────────────────────────────
            if stats_visible {
                egui::Area::new(egui::Id::new("frame_stats"))
                    .anchor(egui::Align2::RIGHT_BOTTOM, egui::vec2(-10.0, -10.0))
                    .show(ctx, |ui| {
                        panel_frame().show(ui, |ui: &mut egui::Ui| {
                            ui.label(format!("FPS: {}", stats.fps));
                            ui.label(format!(
                                "Frame: {:.2} ms (min: {:.1} | max: {:.1})",
                                stats.frame_time_avg_ms, stats.frame_time_min_ms, stats.frame_time_max_ms
                            ));
                            ui.label(format!("Draw calls: {}", stats.draw_calls));
                            ui.label(format!("Triangles: {}", stats.triangles));
                            ui.label(format!("Resolution: {} x {}", stats.resolution.0, stats.resolution.1));
                            ui.label(format!("Camera distance: {:.1}", stats.camera_distance));
                        });
                    });
            }
        });

        self.egui_state
            .handle_platform_output(window, full_output.platform_output);

        let tris = self
            .egui_ctx
            .tessellate(full_output.shapes, full_output.pixels_per_point);

        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(device, queue, *id, image_delta);
        }

        self.egui_renderer
            .update_buffers(device, queue, encoder, &tris, screen_descriptor);

        {
            let render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            self.egui_renderer
                .render(&mut render_pass.forget_lifetime(), &tris, screen_descriptor);
        }

        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }
    }
}

fn panel_frame() -> egui::Frame {
    egui::Frame::none()
        .fill(egui::Color32::from_rgba_premultiplied(0, 0, 0, 180))
        .inner_margin(egui::Margin::same(8.0))
        .rounding(4.0)
}
