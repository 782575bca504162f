//! Static, versioned project skeleton.
//!
//! Each entry is a (path template, content template) pair rendered with
//! Handlebars in strict mode. Resource files under `res/` are NOT part of
//! the skeleton; those come from the generator's resource bundle.

/// Skeleton version, bumped on any template change.
///
/// Participates in the tree content hash together with
/// [`crate::registry::REGISTRY_VERSION`].
pub const SKELETON_VERSION: u32 = 1;

/// Skeleton entries: (res-root-relative path template, content template).
pub const SKELETON: &[(&str, &str)] = &[
    ("app/src/main/AndroidManifest.xml", ANDROID_MANIFEST),
    (
        "app/src/main/java/{{package_path}}/MainActivity.java",
        MAIN_ACTIVITY,
    ),
    ("app/build.gradle", APP_BUILD_GRADLE),
    ("build.gradle", ROOT_BUILD_GRADLE),
    ("settings.gradle", SETTINGS_GRADLE),
    ("gradle.properties", GRADLE_PROPERTIES),
];

const ANDROID_MANIFEST: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<manifest xmlns:android="http://schemas.android.com/apk/res/android"
    package="{{package_name}}">

    <uses-permission android:name="android.permission.INTERNET" />
    <uses-permission android:name="android.permission.ACCESS_NETWORK_STATE" />

    <application
        android:allowBackup="true"
        android:icon="@mipmap/ic_launcher"
        android:label="@string/app_name"
        android:theme="@style/Theme.AppCompat.Light.NoActionBar"
        android:usesCleartextTraffic="false">

        <activity
            android:name=".MainActivity"
            android:exported="true"
            android:label="@string/launcher_name"
            android:configChanges="orientation|screenSize|keyboardHidden">
            <intent-filter>
                <action android:name="android.intent.action.MAIN" />
                <category android:name="android.intent.category.LAUNCHER" />
            </intent-filter>
        </activity>
    </application>
</manifest>
"#;

const MAIN_ACTIVITY: &str = r#"package {{package_name}};

import android.app.Activity;
import android.graphics.Color;
import android.os.Bundle;
import android.webkit.WebResourceRequest;
import android.webkit.WebView;
import android.webkit.WebViewClient;

public class MainActivity extends Activity {

    private WebView webView;

    @Override
    protected void onCreate(Bundle savedInstanceState) {
        super.onCreate(savedInstanceState);

        webView = new WebView(this);
        webView.setBackgroundColor(Color.parseColor("{{background_color}}"));
        webView.getSettings().setJavaScriptEnabled(true);
        webView.getSettings().setDomStorageEnabled(true);
        webView.setWebViewClient(new WebViewClient() {
            @Override
            public boolean shouldOverrideUrlLoading(WebView view, WebResourceRequest request) {
                // Keep in-scope navigation inside the wrapper.
                return !request.getUrl().toString().startsWith("{{launch_url}}");
            }
        });

        setContentView(webView);
        webView.loadUrl("{{launch_url}}");
    }

    @Override
    public void onBackPressed() {
        if (webView.canGoBack()) {
            webView.goBack();
        } else {
            super.onBackPressed();
        }
    }
}
"#;

const APP_BUILD_GRADLE: &str = r#"apply plugin: 'com.android.application'

android {
    namespace '{{package_name}}'
    compileSdk 34

    defaultConfig {
        applicationId "{{package_name}}"
        minSdk 24
        targetSdk 34
        versionCode 1
        versionName "1.0"
    }

    buildTypes {
        release {
            minifyEnabled false
        }
    }
}
"#;

const ROOT_BUILD_GRADLE: &str = r#"buildscript {
    repositories {
        google()
        mavenCentral()
    }
    dependencies {
        classpath 'com.android.tools.build:gradle:8.2.0'
    }
}

allprojects {
    repositories {
        google()
        mavenCentral()
    }
}
"#;

const SETTINGS_GRADLE: &str = r#"rootProject.name = '{{app_name}}'
include ':app'
"#;

const GRADLE_PROPERTIES: &str = r#"org.gradle.jvmargs=-Xmx2048m
android.useAndroidX=true
"#;
