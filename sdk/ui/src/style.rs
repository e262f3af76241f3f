//! Shell stylesheet, injected into the SDK's own shadow root so host CSS
//! cannot leak in and shell CSS cannot leak out. The pulse keyframes here
//! back the executor's CTA pulse class.

pub const SHELL_CSS: &str = r#"
:host {
  all: initial;
  font-family: -apple-system, "Segoe UI", Roboto, sans-serif;
}

.blitsum-shell {
  position: fixed;
  bottom: 24px;
  right: 24px;
  z-index: 2147483000;
}

.blitsum-bubble {
  max-width: 320px;
  padding: 10px 14px;
  border-radius: 14px;
  margin-top: 8px;
  background: #ffffff;
  box-shadow: 0 4px 18px rgba(15, 23, 42, 0.18);
  font-size: 14px;
  line-height: 1.4;
}

.blitsum-bubble.user {
  background: #6366f1;
  color: #ffffff;
}

.blitsum-bubble.error {
  border: 1px solid #ef4444;
  color: #b91c1c;
}

.blitsum-status {
  font-size: 12px;
  opacity: 0.75;
  margin-top: 4px;
}

@keyframes blitsum-pulse {
  0% { box-shadow: 0 0 0 0 rgba(99, 102, 241, 0.55); }
  70% { box-shadow: 0 0 0 14px rgba(99, 102, 241, 0); }
  100% { box-shadow: 0 0 0 0 rgba(99, 102, 241, 0); }
}

.blitsum-pulse {
  animation: blitsum-pulse 1s ease-out 3;
}
"#;
