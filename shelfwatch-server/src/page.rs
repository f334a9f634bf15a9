//! Server-rendered monitoring page

use base64::{engine::general_purpose::STANDARD, Engine as _};
use shelfwatch_core::stock::{SLIDER_MAX, SLIDER_MIN};
use shelfwatch_core::{StockReport, StockTier};

/// How the operator hands an image to the page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMethod {
    #[default]
    Upload,
    Camera,
}

impl InputMethod {
    /// Unknown values fall back to upload
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "camera" => InputMethod::Camera,
            _ => InputMethod::Upload,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputMethod::Upload => "upload",
            InputMethod::Camera => "camera",
        }
    }
}

/// Everything the page needs for one render
#[derive(Debug, Default)]
pub struct PageView {
    pub method: InputMethod,
    pub threshold: u32,
    pub outcome: Option<Outcome>,
}

#[derive(Debug)]
pub enum Outcome {
    Detected { report: StockReport, png: Vec<u8> },
    Failed(String),
}

const STYLE: &str = r#"
body { margin: 0; font-family: 'Poppins', sans-serif; color: #1a1a1a;
       background: linear-gradient(135deg, #ffecd2, #fcb69f); min-height: 100vh; }
h1 { text-align: center; font-size: 48px; margin: 20px 0; }
.subtitle { text-align: center; font-size: 18px; }
.layout { display: flex; gap: 20px; padding: 20px; }
.sidebar { width: 260px; padding: 20px; border-radius: 25px; font-weight: bold;
           background: linear-gradient(to bottom, #ffecd2, #ffb199); }
.columns { display: flex; flex: 1; gap: 20px; }
.card { flex: 1; padding: 20px; border-radius: 25px; margin-bottom: 20px;
        background: rgba(255,255,255,0.9); box-shadow: 0 10px 25px rgba(0,0,0,0.15); }
.card h3 { text-align: center; }
button { background: linear-gradient(90deg, #ff7e5f, #feb47b); color: white; border: none;
         padding: 12px 25px; border-radius: 15px; font-size: 18px; font-weight: bold; }
.alert { padding: 15px; border-radius: 12px; text-align: center; font-weight: bold; font-size: 16px; }
.alert-success { background: linear-gradient(to right, #28a745, #85e085); color: white; }
.alert-warning { background: linear-gradient(to right, #ffc107, #ffec80); color: black; }
.alert-danger { background: linear-gradient(to right, #dc3545, #ff6b6b); color: white; }
img { max-width: 100%; border-radius: 15px; box-shadow: 0 8px 20px rgba(0,0,0,0.2); }
footer { text-align: center; font-size: 14px; border-top: 1px solid #1a1a1a; padding: 10px; }
"#;

pub const PLACEHOLDER: &str = "Upload or capture an image to see results.";

pub fn render(view: &PageView) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Smart Shelf Monitoring</title>
    <style>{style}</style>
</head>
<body>
    <h1>Smart Shelf Monitoring System</h1>
    <p class="subtitle">AI-powered shelf detection to monitor product availability in real-time</p>
    <form class="layout" method="post" action="/detect" enctype="multipart/form-data">
        <aside class="sidebar">
            <h2>Settings</h2>
            <p>Select Input Method</p>
            {methods}
            <label for="threshold">Stock Threshold: <output id="threshold-value">{threshold}</output></label>
            <input type="range" id="threshold" name="threshold" min="{min}" max="{max}" value="{threshold}"
                   oninput="document.getElementById('threshold-value').value = this.value">
        </aside>
        <div class="columns">
            <section class="card">
                <h3>Input Section</h3>
                {input}
                <p><button type="submit">Detect</button></p>
            </section>
            <section class="card">
                <h3>Detection Results</h3>
                {results}
            </section>
        </div>
    </form>
    <footer>Smart Shelf Monitoring</footer>
</body>
</html>
"#,
        style = STYLE,
        methods = render_methods(view.method),
        threshold = view.threshold,
        min = SLIDER_MIN,
        max = SLIDER_MAX,
        input = render_input(view.method),
        results = render_results(view.outcome.as_ref()),
    )
}

/// Reload with the chosen method, carrying the slider along
const SWITCH_METHOD: &str = "window.location.search = 'method=' + this.value + '&threshold=' + document.getElementById('threshold').value";

/// Same types the server accepts
const IMAGE_ACCEPT: &str = "image/jpeg,image/png,.jpg,.jpeg,.png";

/// Live preview plus a snapshot button. The frame is encoded as a JPEG and
/// placed into the `image` file input, so submitting works like an upload.
/// Without camera access the widget hides itself and the file input remains.
const CAMERA_WIDGET: &str = r#"<div class="camera">
                    <video id="camera-preview" autoplay playsinline muted></video>
                    <canvas id="camera-frame" hidden></canvas>
                    <p><button type="button" id="camera-snap">Take Photo</button></p>
                </div>
                <script>
                (function () {
                    const video = document.getElementById('camera-preview');
                    const canvas = document.getElementById('camera-frame');
                    const snap = document.getElementById('camera-snap');
                    const input = document.getElementById('camera-file');
                    function unavailable() { video.hidden = true; snap.hidden = true; }
                    if (!navigator.mediaDevices || !navigator.mediaDevices.getUserMedia) { unavailable(); return; }
                    navigator.mediaDevices.getUserMedia({ video: true })
                        .then(function (stream) { video.srcObject = stream; })
                        .catch(unavailable);
                    snap.addEventListener('click', function () {
                        canvas.width = video.videoWidth;
                        canvas.height = video.videoHeight;
                        canvas.getContext('2d').drawImage(video, 0, 0);
                        canvas.toBlob(function (blob) {
                            const transfer = new DataTransfer();
                            transfer.items.add(new File([blob], 'capture.jpg', { type: 'image/jpeg' }));
                            input.files = transfer.files;
                            canvas.hidden = false;
                        }, 'image/jpeg', 0.92);
                    });
                })();
                </script>"#;

fn render_methods(selected: InputMethod) -> String {
    [(InputMethod::Upload, "Upload Image"), (InputMethod::Camera, "Capture from Camera")]
        .iter()
        .map(|(method, label)| {
            format!(
                r#"<label><input type="radio" name="method" value="{}"{} onchange="{}"> {}</label><br>"#,
                method.as_str(),
                if *method == selected { " checked" } else { "" },
                SWITCH_METHOD,
                label
            )
        })
        .collect::<Vec<_>>()
        .join("\n            ")
}

fn render_input(method: InputMethod) -> String {
    match method {
        InputMethod::Upload => format!(
            r#"<label>Upload a shelf image <input type="file" name="image" accept="{}"></label>"#,
            IMAGE_ACCEPT
        ),
        // Mobile browsers open the camera for file inputs with `capture`
        InputMethod::Camera => format!(
            r#"{}
                <label>Or take a photo <input type="file" id="camera-file" name="image" accept="{}" capture="environment"></label>"#,
            CAMERA_WIDGET, IMAGE_ACCEPT
        ),
    }
}

fn render_results(outcome: Option<&Outcome>) -> String {
    match outcome {
        None => format!("<p>{}</p>", PLACEHOLDER),
        Some(Outcome::Failed(message)) => {
            format!(r#"<div class="alert alert-danger">{}</div>"#, escape_html(message))
        }
        Some(Outcome::Detected { report, png }) => format!(
            r#"<figure><img src="data:image/png;base64,{}" alt="Detected Products"><figcaption>Detected Products</figcaption></figure>
                <div class="alert {}">{}{}</div>"#,
            STANDARD.encode(png),
            report.tier.css_class(),
            tier_icon(report.tier),
            escape_html(&report.message()),
        ),
    }
}

fn tier_icon(tier: StockTier) -> &'static str {
    match tier {
        StockTier::Sufficient => "&#9989; ",
        StockTier::Understocked | StockTier::AtThreshold => "&#9888;&#65039; ",
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfwatch_core::Threshold;

    fn view(outcome: Option<Outcome>) -> PageView {
        PageView { method: InputMethod::Upload, threshold: 5, outcome }
    }

    #[test]
    fn test_empty_page_shows_placeholder_and_slider() {
        let html = render(&view(None));
        assert!(html.contains(PLACEHOLDER));
        assert!(html.contains(r#"min="1" max="20" value="5""#));
        assert!(html.contains(r#"value="upload" checked"#));
    }

    #[test]
    fn test_result_banner_class() {
        let report = StockReport::new(2, Threshold::new(5).unwrap());
        let html = render(&view(Some(Outcome::Detected { report, png: vec![1, 2, 3] })));
        assert!(html.contains("alert alert-danger"));
        assert!(html.contains("ALERT: Only 2 products detected. Restock needed!"));
        assert!(html.contains("data:image/png;base64,AQID"));
        assert!(!html.contains(PLACEHOLDER));
    }

    #[test]
    fn test_failure_is_escaped() {
        let html = render(&view(Some(Outcome::Failed("<script>".to_string()))));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn test_method_switch_keeps_threshold() {
        let html = render(&PageView { method: InputMethod::Upload, threshold: 12, outcome: None });
        assert!(html.contains("'&threshold=' + document.getElementById('threshold').value"));
        assert_eq!(html.matches(SWITCH_METHOD).count(), 2);
    }

    #[test]
    fn test_inputs_accept_only_served_types() {
        for method in [InputMethod::Upload, InputMethod::Camera] {
            let html = render_input(method);
            assert!(html.contains(r#"accept="image/jpeg,image/png,.jpg,.jpeg,.png""#));
            assert!(!html.contains("image/*"));
        }
    }

    #[test]
    fn test_camera_widget_posts_jpeg_into_image_field() {
        let html = render_input(InputMethod::Camera);
        assert!(html.contains("getUserMedia"));
        assert!(html.contains("'capture.jpg', { type: 'image/jpeg' }"));
        assert!(html.contains(r#"id="camera-file" name="image""#));
        assert!(!render_input(InputMethod::Upload).contains("getUserMedia"));
    }

    #[test]
    fn test_input_method_parse() {
        assert_eq!(InputMethod::parse("camera"), InputMethod::Camera);
        assert_eq!(InputMethod::parse(" Camera "), InputMethod::Camera);
        assert_eq!(InputMethod::parse("upload"), InputMethod::Upload);
        assert_eq!(InputMethod::parse("anything"), InputMethod::Upload);
    }
}
