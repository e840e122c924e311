use axum::response::Html;
use serde_json::json;

use crate::session::{Arrival, Role};

/// Settings the meeting page needs from the server config
#[derive(Debug, Clone)]
pub struct PageConfig {
    pub meeting_path: String,
    pub poll_interval_ms: u64,
    pub stun_servers: Vec<String>,
}

const STYLE: &str = r#"
        * { margin: 0; padding: 0; box-sizing: border-box; }
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; background: #0a0a0a; color: #e0e0e0; line-height: 1.6; }
        .container { max-width: 1000px; margin: 0 auto; padding: 40px 20px; }
        h1 { font-size: 2.2em; margin-bottom: 10px; background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); -webkit-background-clip: text; -webkit-text-fill-color: transparent; }
        .subtitle { color: #888; margin-bottom: 30px; }
        .videos { display: flex; gap: 20px; flex-wrap: wrap; margin-bottom: 20px; }
        .card { background: #1a1a1a; border-radius: 12px; padding: 20px; border: 1px solid #2a2a2a; flex: 1; min-width: 300px; }
        video { width: 100%; background: #000; border-radius: 8px; }
        button { background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 12px 30px; border: none; border-radius: 6px; cursor: pointer; font-size: 16px; font-weight: 600; margin-right: 10px; }
        button:disabled { opacity: 0.4; cursor: default; }
        #log { font-family: monospace; color: #888; font-size: 13px; margin-top: 20px; white-space: pre-wrap; }
"#;

/// Meeting page for the role just handed out. Both roles share one page;
/// the role only decides whether it starts with an offer or waits for one.
pub fn meeting_page(arrival: &Arrival, config: &PageConfig) -> Html<String> {
    let ice_servers: Vec<_> = config
        .stun_servers
        .iter()
        .map(|url| json!({ "urls": url }))
        .collect();

    let page_config = json!({
        "role": arrival.role.id(),
        "offerer": arrival.role == Role::First,
        "pairing": arrival.pairing,
        "meetingPath": config.meeting_path,
        "pollIntervalMs": config.poll_interval_ms,
        "iceServers": ice_servers,
    })
    .to_string()
    // keep config strings from closing the script element
    .replace("</", "<\\/");

    let action = if arrival.role == Role::First {
        "Start Call"
    } else {
        "Join Call"
    };

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Tandem - Client {role_id}</title>
    <style>{style}</style>
</head>
<body>
    <div class="container">
        <h1>Client {role_id}</h1>
        <p class="subtitle">Pairing #{pairing} &middot; role: {role}</p>
        <div class="videos">
            <div class="card"><p>Local Video</p><video id="localVideo" autoplay playsinline muted></video></div>
            <div class="card"><p>Remote Video</p><video id="remoteVideo" autoplay playsinline></video></div>
        </div>
        <button id="startButton">Start Local Stream</button>
        <button id="connectButton" disabled>{action}</button>
        <button id="hangupButton" disabled>Hang Up</button>
        <div id="log"></div>
    </div>
    <script>
'use strict';
const CONFIG = {page_config};

const localVideo = document.getElementById('localVideo');
const remoteVideo = document.getElementById('remoteVideo');
const startButton = document.getElementById('startButton');
const connectButton = document.getElementById('connectButton');
const hangupButton = document.getElementById('hangupButton');

let localStream = null;
let pc = null;
let polling = null;

function trace(text) {{
    const now = (window.performance.now() / 1000).toFixed(3);
    console.log(now, text);
    document.getElementById('log').textContent += now + ' ' + text + '\n';
}}

async function startLocal() {{
    startButton.disabled = true;
    try {{
        localStream = await navigator.mediaDevices.getUserMedia({{ video: true, audio: true }});
        localVideo.srcObject = localStream;
        connectButton.disabled = false;
        trace('Local stream started');
    }} catch (e) {{
        trace('getUserMedia error: ' + e);
        startButton.disabled = false;
    }}
}}

// Resolves once ICE gathering is done so candidates ride along in the SDP
function gatheringComplete(conn) {{
    if (conn.iceGatheringState === 'complete') return Promise.resolve();
    return new Promise(resolve => {{
        conn.addEventListener('icegatheringstatechange', () => {{
            if (conn.iceGatheringState === 'complete') resolve();
        }});
    }});
}}

async function publish(description) {{
    const response = await fetch(CONFIG.meetingPath, {{
        method: 'POST',
        headers: {{ 'Content-Type': 'application/json; charset=utf-8' }},
        body: JSON.stringify({{ id: CONFIG.role, offer: description, pairing: CONFIG.pairing }}),
    }});
    if (!response.ok) throw new Error('publish failed: ' + response.status + ' ' + await response.text());
    trace('Published local description');
}}

// Polls until the other role has published, 404 means not yet
function awaitRemote() {{
    return new Promise((resolve, reject) => {{
        polling = setInterval(async () => {{
            try {{
                const response = await fetch(CONFIG.meetingPath + '/' + CONFIG.role + '?pairing=' + CONFIG.pairing, {{ cache: 'no-store' }});
                if (response.status === 404) return;
                clearInterval(polling);
                polling = null;
                if (!response.ok) {{
                    reject(new Error('fetch failed: ' + response.status));
                    return;
                }}
                resolve(await response.json());
            }} catch (e) {{
                trace('poll error: ' + e);
            }}
        }}, CONFIG.pollIntervalMs);
    }});
}}

async function connect() {{
    connectButton.disabled = true;
    hangupButton.disabled = false;

    pc = new RTCPeerConnection({{ iceServers: CONFIG.iceServers }});
    pc.addEventListener('track', event => {{ remoteVideo.srcObject = event.streams[0]; }});
    pc.addEventListener('iceconnectionstatechange', () => trace('ICE state: ' + pc.iceConnectionState));
    localStream.getTracks().forEach(track => pc.addTrack(track, localStream));

    try {{
        if (CONFIG.offerer) {{
            await pc.setLocalDescription(await pc.createOffer());
            await gatheringComplete(pc);
            await publish(pc.localDescription);
            trace('Waiting for answer');
            await pc.setRemoteDescription(await awaitRemote());
        }} else {{
            trace('Waiting for offer');
            await pc.setRemoteDescription(await awaitRemote());
            await pc.setLocalDescription(await pc.createAnswer());
            await gatheringComplete(pc);
            await publish(pc.localDescription);
        }}
        trace('Remote description applied');
    }} catch (e) {{
        trace('Negotiation error: ' + e);
    }}
}}

function hangup() {{
    if (polling) clearInterval(polling);
    if (pc) pc.close();
    pc = null;
    hangupButton.disabled = true;
    connectButton.disabled = !localStream;
    trace('Hung up');
}}

startButton.addEventListener('click', startLocal);
connectButton.addEventListener('click', connect);
hangupButton.addEventListener('click', hangup);
    </script>
</body>
</html>"#,
        role_id = arrival.role.id(),
        role = arrival.role,
        pairing = arrival.pairing,
        style = STYLE,
        action = action,
        page_config = page_config,
    );

    Html(html)
}

/// Shown to a third arrival while both roles are taken
pub fn pairing_full_page() -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>Tandem - Pairing full</title>
    <style>{}</style>
</head>
<body>
    <div class="container">
        <h1>Pairing full</h1>
        <p class="subtitle">Both participants are already connected. Try again once they have finished.</p>
    </div>
</body>
</html>"#,
        STYLE
    ))
}
